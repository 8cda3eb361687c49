//! Data models for Maktaba

pub mod author;
pub mod book;
pub mod kpi;
pub mod lang;
pub mod loan;
pub mod member;

// Re-export commonly used types
pub use author::{Author, AuthorProfile};
pub use book::{Book, BookQuery, BookSummary};
pub use kpi::Kpis;
pub use lang::{Lang, LocalizedNote, LocalizedText};
pub use loan::{LoanEntry, LoanSummary, ReturnOutcome};
pub use member::{Member, MemberProfile};
