//! Structural assertions against the live DOM.
//!
//! Both checks resolve their locator once, at call time, with no implicit
//! waiting. They are read-only. A failed check is a [`HarnessError::NotFound`]
//! naming the subject that was expected.

use crate::driver::Driver;
use crate::locator::Locator;
use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The predicate a check verified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "predicate", rename_all = "snake_case")]
pub enum Predicate {
    /// First match exists and is visible
    Visible,
    /// At least `min` matches exist
    CountAtLeast {
        /// Required minimum
        min: usize,
        /// Observed count
        found: usize,
    },
}

/// Confirmation of a passed check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    /// Human label of what was checked
    pub subject: String,
    /// What held
    #[serde(flatten)]
    pub predicate: Predicate,
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.predicate {
            Predicate::Visible => write!(f, "{} visible", self.subject),
            Predicate::CountAtLeast { found, .. } => {
                write!(f, "{} present ({found} found)", self.subject)
            }
        }
    }
}

/// Assert the first element matching `locator` is visible
pub async fn assert_visible<D: Driver + ?Sized>(
    driver: &D,
    locator: &Locator,
    subject: &str,
) -> HarnessResult<Check> {
    let matches = driver.resolve(locator).await?;
    match matches.first() {
        Some(first) if first.visible => Ok(Check {
            subject: subject.to_string(),
            predicate: Predicate::Visible,
        }),
        _ => Err(HarnessError::not_found(subject)),
    }
}

/// Assert at least `min` elements match `locator`
pub async fn assert_count_at_least<D: Driver + ?Sized>(
    driver: &D,
    locator: &Locator,
    min: usize,
    subject: &str,
) -> HarnessResult<Check> {
    let found = if min == 0 {
        0
    } else {
        driver.resolve(locator).await?.len()
    };
    if found < min {
        return Err(HarnessError::not_found(subject));
    }
    Ok(Check {
        subject: subject.to_string(),
        predicate: Predicate::CountAtLeast { min, found },
    })
}
