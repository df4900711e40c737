mod common;

use anyhow::Result;
use common::{StandardSetup, parse_date, record, test_service};
use fintrack::application::UNCATEGORIZED;
use fintrack::domain::{EntryKind, YearMonth};

#[tokio::test]
async fn test_monthly_summary() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_all(&service).await?;

    record(&service, "Checking", EntryKind::Income, 300000, Some("Salary"), "2024-03-01").await?;
    record(&service, "Checking", EntryKind::Expense, 120000, Some("Rent"), "2024-03-01").await?;
    record(&service, "Checking", EntryKind::Expense, 30000, Some("Groceries"), "2024-03-10").await?;
    record(&service, "Cash", EntryKind::Expense, 20000, Some("Groceries"), "2024-03-20").await?;
    record(&service, "Cash", EntryKind::Expense, 30000, None, "2024-03-21").await?;
    // Next month, excluded.
    record(&service, "Cash", EntryKind::Expense, 99900, Some("Dining"), "2024-04-01").await?;

    let summary = service.monthly_summary(YearMonth::new(2024, 3)?).await?;
    assert_eq!(summary.total_income, 300000);
    assert_eq!(summary.total_expense, 200000);
    assert_eq!(summary.balance, 100000);

    let categories = &summary.expense_by_category;
    assert_eq!(categories.len(), 3);
    assert_eq!(categories[0].category, "Rent");
    assert_eq!(categories[0].percentage, 60.0);
    assert_eq!(categories[1].category, "Groceries");
    assert_eq!(categories[1].count, 2);
    assert_eq!(categories[1].average, 25000);
    assert_eq!(categories[1].percentage, 25.0);
    assert_eq!(categories[2].category, UNCATEGORIZED);
    assert_eq!(categories[2].category_id, None);

    let total_percent: f64 = categories.iter().map(|c| c.percentage).sum();
    assert!((total_percent - 100.0).abs() < 1e-9);

    Ok(())
}

#[tokio::test]
async fn test_monthly_summary_empty_month() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let summary = service.monthly_summary(YearMonth::new(2024, 1)?).await?;
    assert_eq!(summary.total_income, 0);
    assert_eq!(summary.total_expense, 0);
    assert_eq!(summary.balance, 0);
    assert!(summary.expense_by_category.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_category_report_for_range() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_all(&service).await?;

    record(&service, "Checking", EntryKind::Income, 300000, Some("Salary"), "2024-01-31").await?;
    record(&service, "Checking", EntryKind::Income, 300000, Some("Salary"), "2024-02-29").await?;
    record(&service, "Checking", EntryKind::Expense, 5000, Some("Dining"), "2024-02-10").await?;

    let report = service
        .category_report(EntryKind::Income, parse_date("2024-01-01"), parse_date("2024-03-01"))
        .await?;
    assert_eq!(report.kind, EntryKind::Income);
    assert_eq!(report.total, 600000);
    assert_eq!(report.categories.len(), 1);
    assert_eq!(report.categories[0].category, "Salary");
    assert_eq!(report.categories[0].count, 2);
    assert_eq!(report.categories[0].percentage, 100.0);

    // The end of the range is exclusive.
    let january = service
        .category_report(EntryKind::Income, parse_date("2024-01-01"), parse_date("2024-01-31"))
        .await?;
    assert_eq!(january.total, 0);
    assert!(january.categories.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_monthly_trend_has_twelve_months() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_all(&service).await?;

    record(&service, "Checking", EntryKind::Income, 300000, Some("Salary"), "2024-01-15").await?;
    record(&service, "Checking", EntryKind::Expense, 50000, Some("Rent"), "2024-01-16").await?;
    record(&service, "Checking", EntryKind::Expense, 20000, Some("Dining"), "2024-12-31").await?;
    record(&service, "Checking", EntryKind::Expense, 77700, Some("Dining"), "2023-12-31").await?;

    let trend = service.monthly_trend(2024).await?;
    assert_eq!(trend.year, 2024);
    assert_eq!(trend.months.len(), 12);

    assert_eq!(trend.months[0].month, YearMonth::new(2024, 1)?);
    assert_eq!(trend.months[0].income, 300000);
    assert_eq!(trend.months[0].expense, 50000);
    assert_eq!(trend.months[0].net, 250000);

    assert_eq!(trend.months[5].income, 0);
    assert_eq!(trend.months[5].expense, 0);

    assert_eq!(trend.months[11].expense, 20000);
    assert_eq!(trend.months[11].net, -20000);

    assert_eq!(trend.total_income, 300000);
    assert_eq!(trend.total_expense, 70000);

    Ok(())
}

#[tokio::test]
async fn test_summary_serializes_to_json() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_all(&service).await?;
    record(&service, "Cash", EntryKind::Expense, 1250, Some("Dining"), "2024-03-03").await?;

    let summary = service.monthly_summary(YearMonth::new(2024, 3)?).await?;
    let json = serde_json::to_value(&summary)?;

    assert_eq!(json["total_expense"], 1250);
    assert_eq!(json["expense_by_category"][0]["category"], "Dining");

    Ok(())
}
