/// Error shown to the user: a message and an optional hint
#[derive(Debug)]
pub struct Error(String, Option<String>);

impl Error {
    pub fn new(message: &str, details: Option<&str>) -> Self {
        Error(message.to_string(), details.map(|d| d.to_string()))
    }

    pub fn message(&self) -> &str {
        &self.0
    }

    pub fn details(&self) -> Option<&str> {
        self.1.as_deref()
    }
}

/// Display the message and details, as sort of a hint
impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}\n\n{}",
            self.0,
            console::style(self.1.clone().unwrap_or("".into())).dim()
        )
    }
}

impl std::error::Error for Error {}

/// Automatically convert all eyre error reports
///
/// A report wrapping an Error keeps its message and hint, others show the report chain.
impl From<eyre::Report> for Error {
    fn from(error: eyre::Report) -> Self {
        log::error!("{error:?}");

        error.downcast::<Error>().unwrap_or_else(|err| {
            let chain = err
                .chain()
                .map(|cause| cause.to_string())
                .collect::<Vec<String>>();

            Error::new(&chain.join(": "), None)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    #[test]
    fn test_should_keep_wrapped_error() {
        let report = eyre::Report::new(Error::new("Invalid config", Some("Fix stack.toml")));
        let error: Error = report.into();

        assert_eq!(error.message(), "Invalid config");
        assert_eq!(error.details(), Some("Fix stack.toml"));
    }

    #[test]
    fn test_should_join_report_chain() {
        let report = Err::<(), _>(eyre::eyre!("empty id"))
            .wrap_err("Invalid stack id")
            .unwrap_err();

        let error: Error = report.into();
        assert_eq!(error.message(), "Invalid stack id: empty id");
        assert_eq!(error.details(), None);
    }
}
