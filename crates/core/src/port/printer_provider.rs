// Default Printer Port

/// Resolves the operating system's default printer
#[cfg_attr(test, mockall::automock)]
pub trait PrinterProvider: Send + Sync {
    /// Name of the default printer, or an empty string when none is
    /// configured or the lookup fails. Never errors.
    fn default_printer_name(&self) -> String;
}

pub mod mocks {
    use super::PrinterProvider;

    /// Always reports the same default printer
    pub struct FixedPrinterProvider(pub String);

    impl FixedPrinterProvider {
        pub fn new(name: impl Into<String>) -> Self {
            Self(name.into())
        }
    }

    impl PrinterProvider for FixedPrinterProvider {
        fn default_printer_name(&self) -> String {
            self.0.clone()
        }
    }
}
