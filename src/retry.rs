macro_rules! retry_load_operation {
    ($context:expr, $max_attempts:expr, $delay_ms:expr, $operation:expr) => {{
        let max_attempts: u32 = ($max_attempts).max(1);
        let delay = std::time::Duration::from_millis($delay_ms);
        let context_value: String = $context.into();
        let mut attempt = 1;

        loop {
            match $operation {
                Ok(value) => break Ok(value),
                Err(err) if attempt >= max_attempts || !err.is_transient() => break Err(err),
                Err(err) => {
                    log::warn!(
                        "Attempt {}/{} for {} failed: {}. Retrying in {}ms.",
                        attempt,
                        max_attempts,
                        context_value,
                        err,
                        delay.as_millis()
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }};
}

pub(crate) use retry_load_operation;

#[cfg(test)]
mod tests {
    use crate::error::BacktestError;
    use std::cell::Cell;

    fn io_error(ticker: &str) -> BacktestError {
        BacktestError::Io {
            ticker: ticker.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Interrupted, "flaky disk"),
        }
    }

    #[test]
    fn retries_transient_failures_until_success() {
        let calls = Cell::new(0);
        let result: Result<u32, BacktestError> = retry_load_operation!("AAA", 3u32, 0, {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(io_error("AAA"))
            } else {
                Ok(7)
            }
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn does_not_retry_deterministic_failures() {
        let calls = Cell::new(0);
        let result: Result<u32, BacktestError> = retry_load_operation!("BBB", 5u32, 0, {
            calls.set(calls.get() + 1);
            Err(BacktestError::NotFound {
                ticker: "BBB".to_string(),
            })
        });
        assert!(matches!(result, Err(BacktestError::NotFound { .. })));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let result: Result<u32, BacktestError> = retry_load_operation!("CCC", 2u32, 0, {
            calls.set(calls.get() + 1);
            Err(io_error("CCC"))
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 2);
    }
}
