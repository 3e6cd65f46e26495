pub mod batch;
pub mod client;

pub use batch::{split_into_batches, BatchReport, BatchScheduler};
pub use client::{sha1_file, DownloadOutcome, DownloadTask, Downloader};
