use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("pixel index {index} out of range for a strip of {len}")]
    PixelIndex { index: usize, len: usize },

    #[error("pwm channel {0} out of range")]
    Channel(u8),

    #[error("output device: {0}")]
    Device(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// Reported through the cpal error callback while the stream was running.
    #[error("audio stream failed: {0}")]
    Stream(String),

    #[error("audio analyzer thread panicked")]
    Panicked,
}

#[derive(Debug, Error)]
pub enum ShowError {
    #[error(transparent)]
    Output(#[from] OutputError),

    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),
}
