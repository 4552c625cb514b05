//! Simulated user input.
//!
//! Every interaction resolves its locator to the first match, scrolls it into
//! view, then re-reads the same element before acting so that input lands on
//! its current position. An element that matched nothing is
//! [`HarnessError::NotFound`]; one that vanished or lost its box between
//! resolve and act is a [`HarnessError::InteractionFault`].
//!
//! Nothing here waits for the application to react. Callers settle
//! explicitly after each interaction.

use crate::driver::Driver;
use crate::locator::{ElementSnapshot, Locator, Point};
use crate::result::{HarnessError, HarnessResult};
use std::time::Duration;
use tracing::debug;

/// A pointer press that has not been released yet
#[derive(Debug, Clone, PartialEq)]
#[must_use = "a held pointer must be released"]
pub struct PointerHold {
    subject: String,
    point: Point,
}

impl PointerHold {
    /// Subject that is being pressed
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Where the pointer is held
    #[must_use]
    pub const fn point(&self) -> Point {
        self.point
    }
}

fn input_fault(subject: &str) -> impl FnOnce(HarnessError) -> HarnessError + '_ {
    move |e| HarnessError::interaction(subject, e.to_string())
}

async fn first_match<D: Driver + ?Sized>(
    driver: &D,
    locator: &Locator,
    subject: &str,
) -> HarnessResult<ElementSnapshot> {
    driver
        .resolve(locator)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| HarnessError::not_found(subject))
}

async fn target_point<D: Driver + ?Sized>(
    driver: &mut D,
    locator: &Locator,
    subject: &str,
) -> HarnessResult<Point> {
    let target = first_match(&*driver, locator, subject).await?;
    let present = driver
        .scroll_into_view(locator, target.index)
        .await
        .map_err(input_fault(subject))?;
    if !present {
        return Err(HarnessError::interaction(
            subject,
            "element disappeared before input",
        ));
    }

    let current = driver
        .query_all(locator)
        .await
        .map_err(input_fault(subject))?
        .into_iter()
        .find(|e| e.index == target.index && locator.matches(e))
        .ok_or_else(|| HarnessError::interaction(subject, "element disappeared before input"))?;

    current
        .click_point()
        .ok_or_else(|| HarnessError::interaction(subject, "element has no visible area"))
}

/// Click the first element matching `locator`
pub async fn click<D: Driver + ?Sized>(
    driver: &mut D,
    locator: &Locator,
    subject: &str,
) -> HarnessResult<()> {
    let point = target_point(driver, locator, subject).await?;
    debug!(subject, x = point.x, y = point.y, "click");
    driver.mouse_move(point).await.map_err(input_fault(subject))?;
    driver.mouse_down(point).await.map_err(input_fault(subject))?;
    driver.mouse_up(point).await.map_err(input_fault(subject))?;
    Ok(())
}

/// Move to the first element matching `locator` and press without releasing
pub async fn press<D: Driver + ?Sized>(
    driver: &mut D,
    locator: &Locator,
    subject: &str,
) -> HarnessResult<PointerHold> {
    let point = target_point(driver, locator, subject).await?;
    debug!(subject, x = point.x, y = point.y, "pointer down");
    driver.mouse_move(point).await.map_err(input_fault(subject))?;
    driver.mouse_down(point).await.map_err(input_fault(subject))?;
    Ok(PointerHold {
        subject: subject.to_string(),
        point,
    })
}

/// Release a held pointer where it was pressed
pub async fn release<D: Driver + ?Sized>(driver: &mut D, hold: PointerHold) -> HarnessResult<()> {
    debug!(subject = %hold.subject, "pointer up");
    driver
        .mouse_up(hold.point)
        .await
        .map_err(input_fault(&hold.subject))
}

/// Press, wait `duration`, release
pub async fn hold_pointer<D: Driver + ?Sized>(
    driver: &mut D,
    locator: &Locator,
    subject: &str,
    duration: Duration,
) -> HarnessResult<()> {
    let hold = press(driver, locator, subject).await?;
    tokio::time::sleep(duration).await;
    release(driver, hold).await
}

/// Set a range-type control's value directly, firing `input` and `change`
pub async fn set_range_value<D: Driver + ?Sized>(
    driver: &mut D,
    locator: &Locator,
    subject: &str,
    value: &str,
) -> HarnessResult<()> {
    let target = first_match(&*driver, locator, subject).await?;
    debug!(subject, value, "set value");
    let applied = driver
        .set_value(locator, target.index, value)
        .await
        .map_err(input_fault(subject))?;
    if applied {
        Ok(())
    } else {
        Err(HarnessError::interaction(
            subject,
            "element disappeared before input",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MockDriver;
    use crate::locator::BoundingBox;

    fn keys() -> MockDriver {
        MockDriver::with_elements(vec![
            ElementSnapshot::new("button")
                .with_text("Saw")
                .with_bounding_box(BoundingBox::new(0.0, 0.0, 60.0, 30.0)),
            ElementSnapshot::new("button")
                .with_text("A")
                .with_bounding_box(BoundingBox::new(100.0, 200.0, 40.0, 120.0)),
            ElementSnapshot::new("input")
                .with_attribute("type", "range")
                .with_attribute("value", "1000"),
        ])
    }

    mod click_tests {
        use super::*;

        #[tokio::test]
        async fn test_click_hits_center_of_first_match() {
            let mut driver = keys();
            let history = driver.history();
            click(&mut driver, &Locator::tag("button").with_text("Saw"), "Saw button")
                .await
                .unwrap();
            assert!(history.was_called("mouse_down:30,15"));
            assert!(history.was_called("mouse_up:30,15"));
            assert!(!driver.is_pointer_down());
        }

        #[tokio::test]
        async fn test_click_missing_is_not_found() {
            let mut driver = keys();
            let err = click(&mut driver, &Locator::tag("button").with_text("Sine"), "Sine button")
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), "Sine button not found");
        }

        #[tokio::test]
        async fn test_provider_failure_is_interaction_fault() {
            let mut driver = keys();
            driver.fail_on("mouse_down");
            let err = click(&mut driver, &Locator::tag("button").with_text("Saw"), "Saw button")
                .await
                .unwrap_err();
            assert!(matches!(err, HarnessError::InteractionFault { .. }));
        }

        #[tokio::test]
        async fn test_target_gone_before_scroll_is_interaction_fault() {
            let mut driver = keys();
            driver.vanish_on("scroll_into_view");
            let err = click(&mut driver, &Locator::tag("button").with_exact_text("A"), "A key")
                .await
                .unwrap_err();
            assert!(matches!(err, HarnessError::InteractionFault { .. }));
            assert!(err.to_string().contains("element disappeared before input"));
            assert!(!driver.history().was_called("mouse_down"));
        }

        #[tokio::test]
        async fn test_target_gone_after_scroll_is_interaction_fault() {
            let mut driver = keys();
            driver.vanish_after("scroll_into_view");
            let err = click(&mut driver, &Locator::tag("button").with_exact_text("A"), "A key")
                .await
                .unwrap_err();
            assert_eq!(err.kind(), crate::result::FaultKind::InteractionFault);
            assert!(!driver.history().was_called("mouse_move"));
        }

        #[tokio::test]
        async fn test_zero_area_target_is_interaction_fault() {
            let mut driver = MockDriver::with_elements(vec![ElementSnapshot::new("button")
                .with_text("Square")
                .with_bounding_box(BoundingBox::new(0.0, 0.0, 0.0, 0.0))]);
            let err = click(&mut driver, &Locator::tag("button").with_text("Square"), "Square button")
                .await
                .unwrap_err();
            assert!(err.to_string().contains("no visible area"));
        }
    }

    mod hold_tests {
        use super::*;

        #[tokio::test]
        async fn test_exact_text_skips_saw() {
            let mut driver = keys();
            let hold = press(&mut driver, &Locator::tag("button").with_exact_text("A"), "A key")
                .await
                .unwrap();
            assert_eq!(hold.point(), Point::new(120.0, 260.0));
            assert!(driver.is_pointer_down());
            release(&mut driver, hold).await.unwrap();
            assert!(!driver.is_pointer_down());
        }

        #[tokio::test]
        async fn test_hold_pointer_releases() {
            let mut driver = keys();
            let history = driver.history();
            hold_pointer(
                &mut driver,
                &Locator::tag("button").with_exact_text("A"),
                "A key",
                Duration::from_millis(5),
            )
            .await
            .unwrap();
            assert_eq!(history.count("mouse_down"), 1);
            assert_eq!(history.count("mouse_up"), 1);
        }
    }

    mod range_tests {
        use super::*;

        #[tokio::test]
        async fn test_set_range_value() {
            let mut driver = keys();
            let slider = Locator::tag("input").with_attribute("type", "range");
            set_range_value(&mut driver, &slider, "Cutoff slider", "500")
                .await
                .unwrap();
            let current = driver.resolve(&slider).await.unwrap();
            assert_eq!(current[0].attribute("value"), Some("500"));
        }

        #[tokio::test]
        async fn test_set_range_value_vanished_target() {
            let mut driver = keys();
            driver.vanish_on("set_value");
            let slider = Locator::tag("input").with_attribute("type", "range");
            let err = set_range_value(&mut driver, &slider, "Cutoff slider", "500")
                .await
                .unwrap_err();
            assert!(matches!(err, HarnessError::InteractionFault { .. }));
            assert!(!matches!(err, HarnessError::NotFound { .. }));
        }

        #[tokio::test]
        async fn test_set_range_value_missing() {
            let mut driver = MockDriver::new();
            let slider = Locator::tag("input").with_attribute("type", "range");
            let err = set_range_value(&mut driver, &slider, "Cutoff slider", "500")
                .await
                .unwrap_err();
            assert!(matches!(err, HarnessError::NotFound { .. }));
        }
    }
}
