//! Support framework.

use failure::Error;

use super::fixture::Fixture;

/// Only types implementing this trait can be returned from test functions.
pub trait TestResult {
    /// Convert this value into a test result.
    fn into_result(self) -> Result<(), Error>;
}

impl<T, E> TestResult for Result<T, E>
where
    Error: From<E>,
{
    fn into_result(self) -> Result<(), Error> {
        self.map(|_| ()).map_err(From::from)
    }
}

impl TestResult for () {
    fn into_result(self) -> Result<(), Error> {
        Ok(self)
    }
}

/// Run a test case against a fresh fixture.
pub fn run_test<F, R>(test: F)
where
    F: FnOnce(Fixture) -> R,
    R: TestResult,
{
    let _ = env_logger::builder().is_test(true).try_init();

    let fixture = match Fixture::new() {
        Ok(fixture) => fixture,
        Err(err) => panic!("Could not set up fixture: {}", err),
    };

    if let Err(err) = test(fixture).into_result() {
        panic!("{}", err);
    }
}
