//! Loan ledger: borrowing, returns and active loan summaries

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, Entity},
    models::{
        book::Book,
        loan::{score_return, LoanEntry, LoanSummary, ReturnOutcome},
        member::Member,
    },
    repository::Repository,
};

/// Result of a successful return
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnReceipt {
    pub book_id: Uuid,
    pub outcome: ReturnOutcome,
    pub return_rate: i32,
}

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
}

impl LoansService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn borrow_book(&self, member_id: Uuid, book_id: Uuid) -> AppResult<LoanEntry> {
        self.borrow_book_at(member_id, book_id, Utc::now()).await
    }

    /// Take one copy of the book and open a loan for the member
    pub async fn borrow_book_at(
        &self,
        member_id: Uuid,
        book_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<LoanEntry> {
        let mut member = self.member(member_id).await?;
        let mut book = self.book(book_id).await?;

        book.take_copy()?;
        let entry = member.open_loan(&book, now)?.clone();

        self.repository.circulation.commit(&member, &book).await?;

        tracing::info!(
            member_id = %member_id,
            book_id = %book_id,
            due = %entry.return_date,
            "Book borrowed"
        );
        Ok(entry)
    }

    pub async fn active_loans(&self, member_id: Uuid) -> AppResult<Vec<LoanSummary>> {
        self.active_loans_at(member_id, Utc::now()).await
    }

    /// Summaries of the member's loans, soonest due first
    pub async fn active_loans_at(
        &self,
        member_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<LoanSummary>> {
        let member = self.member(member_id).await?;

        let mut summaries = Vec::with_capacity(member.borrowed_books.len());
        for entry in &member.borrowed_books {
            let title = self
                .repository
                .books
                .find_by_id(entry.book_id)
                .await?
                .map(|book| book.title.en);
            if title.is_none() {
                tracing::warn!("Loan of member {} refers to missing book {}", member_id, entry.book_id);
            }
            summaries.push(LoanSummary::at(entry, title, now));
        }

        summaries.sort_by_key(|summary| summary.days_left);
        Ok(summaries)
    }

    pub async fn return_book(&self, member_id: Uuid, book_id: Uuid) -> AppResult<ReturnReceipt> {
        self.return_book_at(member_id, book_id, Utc::now()).await
    }

    /// Close the member's loan, put the copy back and score the return
    pub async fn return_book_at(
        &self,
        member_id: Uuid,
        book_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<ReturnReceipt> {
        let mut member = self.member(member_id).await?;
        let entry = member.close_loan(book_id)?;
        let mut book = self.book(book_id).await?;

        let outcome = entry.outcome_at(now);
        member.return_rate = score_return(member.return_rate, outcome);
        book.return_copy();

        let (member, _) = self.repository.circulation.commit(&member, &book).await?;

        tracing::info!(
            member_id = %member_id,
            book_id = %book_id,
            ?outcome,
            return_rate = member.return_rate,
            "Book returned"
        );
        Ok(ReturnReceipt {
            book_id,
            outcome,
            return_rate: member.return_rate,
        })
    }

    async fn member(&self, id: Uuid) -> AppResult<Member> {
        self.repository
            .members
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(Entity::Member, id))
    }

    async fn book(&self, id: Uuid) -> AppResult<Book> {
        self.repository
            .books
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(Entity::Book, id))
    }
}
