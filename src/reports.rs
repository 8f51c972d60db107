//! Aggregates over cached transactions for dashboards and reports.
//!
//! Everything here is a pure function of the collections passed in, so it
//! works equally on a live [`FinanceStore`](crate::store::FinanceStore)
//! snapshot or on data loaded from elsewhere. Transactions whose date does
//! not parse are left out of date-based aggregates.

use std::collections::HashMap;

use chrono::{Datelike as _, Months, NaiveDate};

use crate::error::FinanceError;
use crate::models::{Category, CategoryId, Transaction, TransactionType, parse_iso_date};

/// Income, expenses and their difference.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    /// Sum of income amounts.
    pub income: f64,
    /// Sum of expense amounts.
    pub expenses: f64,
    /// `income - expenses`.
    pub net: f64,
}

impl Totals {
    /// Adds one transaction.
    fn add(&mut self, transaction: &Transaction) {
        match transaction.kind {
            TransactionType::Income => self.income += transaction.amount,
            TransactionType::Expense => self.expenses += transaction.amount,
        }
        self.net += transaction.signed_amount();
    }
}

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Month(NaiveDate);

impl Month {
    /// Returns the month with the given year and number (1-12).
    #[inline]
    #[must_use]
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    /// Returns the month containing `date`.
    #[inline]
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self(date.with_day(1).unwrap_or(date))
    }

    /// First day of the month.
    #[inline]
    #[must_use]
    pub const fn first_day(self) -> NaiveDate {
        self.0
    }

    /// The month before this one.
    #[inline]
    #[must_use]
    pub fn previous(self) -> Option<Self> {
        self.0.checked_sub_months(Months::new(1)).map(Self)
    }

    /// Returns `true` if `date` falls in this month.
    #[inline]
    #[must_use]
    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.0.year() && date.month() == self.0.month()
    }

    /// Every day of the month in order.
    #[inline]
    #[must_use]
    pub fn days(self) -> Vec<NaiveDate> {
        self.0
            .iter_days()
            .take_while(|day| self.contains(*day))
            .collect()
    }
}

impl core::fmt::Display for Month {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m"))
    }
}

impl core::str::FromStr for Month {
    type Err = FinanceError;

    /// Parses `YYYY-MM`.
    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
            .map(Self)
            .map_err(|err| {
                FinanceError::Configuration(format!("invalid month \"{s}\", expected YYYY-MM: {err}"))
            })
    }
}

/// Totals for one month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthSummary {
    /// The month.
    pub month: Month,
    /// Its totals.
    pub totals: Totals,
}

/// Expense total for one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySpending {
    /// Category id.
    pub category_id: CategoryId,
    /// Category name.
    pub name: String,
    /// Category color.
    pub color: String,
    /// Sum of expense amounts.
    pub amount: f64,
    /// Share of all categorized expenses in the range, in percent.
    pub share: f64,
}

/// One day of a calendar view.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarDay {
    /// The day.
    pub date: NaiveDate,
    /// Sum of income amounts.
    pub income: f64,
    /// Sum of expense amounts.
    pub expenses: f64,
    /// Transactions on this day, in input order.
    pub transactions: Vec<Transaction>,
}

impl CalendarDay {
    /// Number of transactions on this day.
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.transactions.len()
    }
}

/// Parsed date of a transaction.
fn date_of(transaction: &Transaction) -> Option<NaiveDate> {
    parse_iso_date(&transaction.date)
}

/// Totals over every transaction, dated or not.
#[inline]
#[must_use]
pub fn totals(transactions: &[Transaction]) -> Totals {
    let mut totals = Totals::default();
    for transaction in transactions {
        totals.add(transaction);
    }
    totals
}

/// Totals for transactions dated in `month`.
#[inline]
#[must_use]
pub fn month_totals(transactions: &[Transaction], month: Month) -> Totals {
    let mut totals = Totals::default();
    for transaction in transactions {
        if date_of(transaction).is_some_and(|date| month.contains(date)) {
            totals.add(transaction);
        }
    }
    totals
}

/// Totals for the `months` months ending with the one containing `today`,
/// oldest first.
#[inline]
#[must_use]
pub fn monthly_summary(transactions: &[Transaction], today: NaiveDate, months: usize) -> Vec<MonthSummary> {
    let mut summary: Vec<MonthSummary> = core::iter::successors(Some(Month::of(today)), |month| {
        month.previous()
    })
    .take(months)
    .map(|month| MonthSummary {
        month,
        totals: month_totals(transactions, month),
    })
    .collect();
    summary.reverse();
    summary
}

/// Expense totals per category for transactions dated `from..=to`,
/// largest first. Expenses in unknown categories are skipped.
#[inline]
#[must_use]
pub fn category_spending(
    transactions: &[Transaction],
    categories: &[Category],
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<CategorySpending> {
    let mut sums: HashMap<&CategoryId, f64> = HashMap::new();
    for transaction in transactions {
        if transaction.kind != TransactionType::Expense {
            continue;
        }
        if !date_of(transaction).is_some_and(|date| (from..=to).contains(&date)) {
            continue;
        }
        *sums.entry(&transaction.category_id).or_default() += transaction.amount;
    }

    let mut spending: Vec<CategorySpending> = categories
        .iter()
        .filter_map(|category| {
            sums.get(&category.id).map(|amount| CategorySpending {
                category_id: category.id.clone(),
                name: category.name.clone(),
                color: category.color.clone(),
                amount: *amount,
                share: 0.0,
            })
        })
        .collect();
    let total: f64 = spending.iter().map(|entry| entry.amount).sum();
    if total > 0.0 {
        for entry in &mut spending {
            entry.share = entry.amount / total * 100.0;
        }
    }
    spending.sort_by(|left, right| right.amount.total_cmp(&left.amount));
    spending
}

/// Every day of `month` with that day's transactions and totals.
#[inline]
#[must_use]
pub fn calendar_month(transactions: &[Transaction], month: Month) -> Vec<CalendarDay> {
    let mut days: Vec<CalendarDay> = month
        .days()
        .into_iter()
        .map(|date| CalendarDay {
            date,
            income: 0.0,
            expenses: 0.0,
            transactions: Vec::new(),
        })
        .collect();
    for transaction in transactions {
        let Some(date) = date_of(transaction).filter(|date| month.contains(*date)) else {
            continue;
        };
        if let Some(day) = days.iter_mut().find(|day| day.date == date) {
            match transaction.kind {
                TransactionType::Income => day.income += transaction.amount,
                TransactionType::Expense => day.expenses += transaction.amount,
            }
            day.transactions.push(transaction.clone());
        }
    }
    days
}

/// Share of `budget` already spent, in percent, capped at 100.
///
/// A non-positive budget counts as fully spent once anything is spent.
#[inline]
#[must_use]
pub fn budget_progress(spent: f64, budget: f64) -> f64 {
    if budget <= 0.0 {
        return if spent > 0.0 { 100.0 } else { 0.0 };
    }
    (spent / budget * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountId, CategoryType, PaymentMethod, TransactionId};

    fn tx(id: &str, date: &str, kind: TransactionType, amount: f64, category: &str) -> Transaction {
        Transaction {
            id: TransactionId::from(id),
            name: id.to_owned(),
            details: None,
            date: date.to_owned(),
            kind,
            amount,
            category_id: CategoryId::from(category),
            account_id: AccountId::from("a1"),
            payment_method: PaymentMethod::DebitCard,
        }
    }

    fn category(id: &str, name: &str) -> Category {
        Category {
            id: CategoryId::from(id),
            name: name.to_owned(),
            kind: CategoryType::Expense,
            color: "#123456".to_owned(),
        }
    }

    fn sample() -> Vec<Transaction> {
        vec![
            tx("salary", "2024-03-01", TransactionType::Income, 3000.0, "c0"),
            tx("rent", "2024-03-02T09:00:00.000Z", TransactionType::Expense, 1200.0, "c1"),
            tx("food", "2024-03-02", TransactionType::Expense, 80.0, "c2"),
            tx("snack", "2024-02-28", TransactionType::Expense, 20.0, "c2"),
            tx("bad", "someday", TransactionType::Expense, 999.0, "c2"),
        ]
    }

    fn march() -> Month {
        Month::new(2024, 3).unwrap()
    }

    #[test]
    fn totals_include_undated() {
        let all = totals(&sample());
        assert_eq!(all.income, 3000.0);
        assert_eq!(all.expenses, 2299.0);
        assert_eq!(all.net, 701.0);
    }

    #[test]
    fn month_totals_skip_other_months_and_bad_dates() {
        let march_totals = month_totals(&sample(), march());
        assert_eq!(march_totals.income, 3000.0);
        assert_eq!(march_totals.expenses, 1280.0);
        assert_eq!(march_totals.net, 1720.0);
    }

    #[test]
    fn month_parsing_and_display() {
        let month: Month = "2024-03".parse().unwrap();
        assert_eq!(month, march());
        assert_eq!(month.to_string(), "2024-03");
        assert!("2024-13".parse::<Month>().is_err());
        assert_eq!(Month::new(2024, 2).unwrap().days().len(), 29);
    }

    #[test]
    fn monthly_summary_is_oldest_first() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let summary = monthly_summary(&sample(), today, 3);
        let months: Vec<String> = summary.iter().map(|entry| entry.month.to_string()).collect();
        assert_eq!(months, ["2024-01", "2024-02", "2024-03"]);
        assert_eq!(summary[0].totals, Totals::default());
        assert_eq!(summary[1].totals.expenses, 20.0);
        assert_eq!(summary[2].totals.income, 3000.0);
    }

    #[test]
    fn monthly_summary_stops_at_earliest_month() {
        let start = Month::of(NaiveDate::MIN)
            .first_day()
            .checked_add_months(Months::new(2))
            .unwrap();
        let summary = monthly_summary(&[], start, usize::MAX);
        assert_eq!(summary.len(), 3);
        assert_eq!(summary[0].month, Month::of(NaiveDate::MIN));
        assert!(monthly_summary(&sample(), start, 0).is_empty());
    }

    #[test]
    fn category_spending_sorted_and_skips_unknown() {
        let categories = vec![category("c1", "Rent"), category("c2", "Food")];
        let spending = category_spending(
            &sample(),
            &categories,
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        );
        assert_eq!(spending.len(), 2);
        assert_eq!(spending[0].name, "Rent");
        assert_eq!(spending[0].amount, 1200.0);
        assert_eq!(spending[1].amount, 100.0);
        let shares: f64 = spending.iter().map(|entry| entry.share).sum();
        assert!((shares - 100.0).abs() < 1e-9);

        let only_known = category_spending(
            &sample(),
            &[category("c2", "Food")],
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        );
        assert_eq!(only_known.len(), 1);
        assert_eq!(only_known[0].share, 100.0);
    }

    #[test]
    fn calendar_covers_every_day() {
        let days = calendar_month(&sample(), march());
        assert_eq!(days.len(), 31);
        assert_eq!(days[0].income, 3000.0);
        assert_eq!(days[1].count(), 2);
        assert_eq!(days[1].expenses, 1280.0);
        assert_eq!(days[30].count(), 0);
    }

    #[test]
    fn budget_progress_is_capped() {
        assert_eq!(budget_progress(2500.0, 5000.0), 50.0);
        assert_eq!(budget_progress(7000.0, 5000.0), 100.0);
        assert_eq!(budget_progress(0.0, 0.0), 0.0);
        assert_eq!(budget_progress(10.0, 0.0), 100.0);
    }
}
