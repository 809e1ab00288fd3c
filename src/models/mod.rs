//! Data models for LibMaster

pub mod book;
pub mod bookmark;
pub mod borrow_request;
pub mod notification;
pub mod patron;

// Re-export commonly used types
pub use book::{Book, BookShort};
pub use bookmark::Bookmark;
pub use borrow_request::{BorrowRequest, BorrowRequestDetails, BorrowStatus, ReturnOutcome};
pub use notification::{
    DailySummaryReport, NotificationRecord, OutgoingNotification, OverdueSweepReport,
};
pub use patron::{Patron, PatronShort, PatronStats};
