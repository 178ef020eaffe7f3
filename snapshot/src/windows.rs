use thiserror::Error;
use types::primitives::FetchWindow;

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum Error {
    #[error(
        "desired window {desired:?} regresses behind previously fetched window {previous:?}; \
         delete the snapshot to refetch"
    )]
    WindowRegression {
        previous: FetchWindow,
        desired: FetchWindow,
    },
}

/// Portion of `desired` not yet covered by `previous`.
///
/// Windows only ever move forward. A desired window starting or ending before
/// the previously fetched one indicates a configuration change that cannot be
/// reconciled with the existing snapshot.
pub fn next_fetch_window(
    previous: Option<FetchWindow>,
    desired: FetchWindow,
) -> Result<FetchWindow, Error> {
    let Some(previous) = previous else {
        return Ok(desired);
    };

    if desired.from < previous.from || desired.to < previous.to {
        return Err(Error::WindowRegression { previous, desired });
    }

    Ok(FetchWindow::new(
        desired.from.max(previous.to),
        desired.to,
    ))
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(None, FetchWindow::new(100, 200) => Ok(FetchWindow::new(100, 200)))]
    #[test_case(
        Some(FetchWindow::new(100, 200)), FetchWindow::new(150, 250)
        => Ok(FetchWindow::new(200, 250));
        "overlapping windows resume from the previous upper bound"
    )]
    #[test_case(
        Some(FetchWindow::new(100, 200)), FetchWindow::new(300, 400)
        => Ok(FetchWindow::new(300, 400));
        "disjoint later windows are fetched in full"
    )]
    #[test_case(
        Some(FetchWindow::new(100, 200)), FetchWindow::new(100, 200)
        => Ok(FetchWindow::new(200, 200));
        "identical windows leave nothing to fetch"
    )]
    #[test_case(
        Some(FetchWindow::new(100, 200)), FetchWindow::new(50, 250)
        => Err(Error::WindowRegression {
            previous: FetchWindow::new(100, 200),
            desired: FetchWindow::new(50, 250),
        });
        "lower bound may not move back"
    )]
    #[test_case(
        Some(FetchWindow::new(100, 200)), FetchWindow::new(120, 180)
        => Err(Error::WindowRegression {
            previous: FetchWindow::new(100, 200),
            desired: FetchWindow::new(120, 180),
        });
        "upper bound may not move back"
    )]
    fn next_fetch_window_cases(
        previous: Option<FetchWindow>,
        desired: FetchWindow,
    ) -> Result<FetchWindow, Error> {
        next_fetch_window(previous, desired)
    }
}
