use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::DatasetError;

/// One-hot encoder over a sorted, de-duplicated set of category names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    categories: Vec<String>,
}

impl CategoryEncoder {
    /// Build from any list of labels; needs at least two distinct values.
    pub fn new<I, S>(labels: I) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = labels.into_iter().map(Into::into).collect();
        if set.len() < 2 {
            return Err(DatasetError::TooFewCategories { found: set.len() });
        }
        Ok(Self {
            categories: set.into_iter().collect(),
        })
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn index_of(&self, category: &str) -> Result<usize, DatasetError> {
        self.categories
            .binary_search_by(|known| known.as_str().cmp(category))
            .map_err(|_| DatasetError::UnknownCategory(category.to_string()))
    }

    pub fn category_at(&self, index: usize) -> Option<&str> {
        self.categories.get(index).map(String::as_str)
    }

    pub fn one_hot(&self, category: &str) -> Result<Vec<f32>, DatasetError> {
        let index = self.index_of(category)?;
        let mut vector = vec![0.0; self.categories.len()];
        vector[index] = 1.0;
        Ok(vector)
    }

    /// Reverse lookup of an exact one-hot vector.
    pub fn category_for_one_hot(&self, vector: &[f32]) -> Result<&str, DatasetError> {
        if vector.len() != self.categories.len() {
            return Err(DatasetError::NotOneHot);
        }
        let mut hot = None;
        for (index, &value) in vector.iter().enumerate() {
            if value == 1.0 {
                if hot.is_some() {
                    return Err(DatasetError::NotOneHot);
                }
                hot = Some(index);
            } else if value != 0.0 {
                return Err(DatasetError::NotOneHot);
            }
        }
        hot.and_then(|index| self.category_at(index))
            .ok_or(DatasetError::NotOneHot)
    }

    pub fn encode_all(&self, labels: &[String]) -> Result<Vec<Vec<f32>>, DatasetError> {
        labels.iter().map(|label| self.one_hot(label)).collect()
    }
}
