use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::core::DataPoint;

/// Unique identifier of a series or collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Series,
    /// Virtual item aggregating the domains of its member series.
    Collection,
}

/// Maps one datapoint to one axis value.
pub type Accessor<D> = Rc<dyn Fn(&D) -> f64>;

/// Wraps a closure as an [`Accessor`].
pub fn accessor<D, F>(f: F) -> Accessor<D>
where
    F: Fn(&D) -> f64 + 'static,
{
    Rc::new(f)
}

/// Per-axis value accessors of an item. Band accessors are optional.
pub struct Accessors<D> {
    pub time: Accessor<D>,
    pub x: Accessor<D>,
    pub x0: Option<Accessor<D>>,
    pub x1: Option<Accessor<D>>,
    pub y: Accessor<D>,
    pub y0: Option<Accessor<D>>,
    pub y1: Option<Accessor<D>>,
}

impl<D> Clone for Accessors<D> {
    fn clone(&self) -> Self {
        Self {
            time: Rc::clone(&self.time),
            x: Rc::clone(&self.x),
            x0: self.x0.clone(),
            x1: self.x1.clone(),
            y: Rc::clone(&self.y),
            y0: self.y0.clone(),
            y1: self.y1.clone(),
        }
    }
}

impl<D> fmt::Debug for Accessors<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessors")
            .field("x_band", &(self.x0.is_some() || self.x1.is_some()))
            .field("y_band", &(self.y0.is_some() || self.y1.is_some()))
            .finish_non_exhaustive()
    }
}

impl Default for Accessors<DataPoint> {
    fn default() -> Self {
        Self {
            time: accessor(|point: &DataPoint| point.timestamp),
            x: accessor(|point: &DataPoint| point.timestamp),
            x0: None,
            x1: None,
            y: accessor(|point: &DataPoint| point.value),
            y0: None,
            y1: None,
        }
    }
}
