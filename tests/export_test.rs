mod common;

use anyhow::Result;
use common::{StandardSetup, record, test_service};
use fintrack::domain::{EntryKind, YearMonth};
use fintrack::io::{DatabaseSnapshot, Exporter};

#[tokio::test]
async fn test_export_transactions_csv() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_all(&service).await?;

    record(&service, "Checking", EntryKind::Income, 300000, Some("Salary"), "2024-03-01").await?;
    record(&service, "Cash", EntryKind::Expense, 1250, None, "2024-03-02").await?;

    let mut buffer = Vec::new();
    let count = Exporter::new(&service)
        .export_transactions_csv(&mut buffer)
        .await?;
    assert_eq!(count, 2);

    let mut reader = csv::Reader::from_reader(buffer.as_slice());
    let headers = reader.headers()?.clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        ["id", "date", "type", "amount", "account", "category", "description", "recurrence"]
    );

    let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>()?;
    assert_eq!(rows.len(), 2);
    // Newest first.
    assert_eq!(&rows[0][2], "expense");
    assert_eq!(&rows[0][3], "12.50");
    assert_eq!(&rows[0][4], "Cash");
    assert_eq!(&rows[0][5], "");
    assert_eq!(&rows[1][3], "3000.00");
    assert_eq!(&rows[1][5], "Salary");

    Ok(())
}

#[tokio::test]
async fn test_export_accounts_and_budgets_csv() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_all(&service).await?;

    let march = YearMonth::new(2024, 3)?;
    service.set_budget("Groceries", march, 20000).await?;
    record(&service, "Checking", EntryKind::Expense, 25000, Some("Groceries"), "2024-03-05").await?;

    let exporter = Exporter::new(&service);

    let mut accounts = Vec::new();
    assert_eq!(exporter.export_accounts_csv(&mut accounts).await?, 2);
    let text = String::from_utf8(accounts)?;
    assert!(text.contains("Checking,EUR,0.00,250.00,750.00"));

    let mut budgets = Vec::new();
    assert_eq!(exporter.export_budgets_csv(&mut budgets, march).await?, 1);
    let text = String::from_utf8(budgets)?;
    assert!(text.contains("2024-03,Groceries,200.00,250.00,-50.00,100.0"));

    Ok(())
}

#[tokio::test]
async fn test_export_goals_csv() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .create_goal("Vacation".into(), 200000, 50000, None, None)
        .await?;

    let mut buffer = Vec::new();
    assert_eq!(Exporter::new(&service).export_goals_csv(&mut buffer).await?, 1);
    let text = String::from_utf8(buffer)?;
    assert!(text.contains("Vacation,2000.00,500.00,1500.00,25,,false"));

    Ok(())
}

#[tokio::test]
async fn test_full_json_snapshot() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.seed_defaults().await?;
    record(&service, "Cash", EntryKind::Expense, 450, Some("Cafe"), "2024-03-02").await?;
    service.set_budget("Cafe", YearMonth::new(2024, 3)?, 5000).await?;
    service
        .create_goal("Vacation".into(), 200000, 0, None, None)
        .await?;

    let mut buffer = Vec::new();
    let snapshot = Exporter::new(&service).export_full_json(&mut buffer).await?;
    assert_eq!(snapshot.accounts.len(), 3);
    assert_eq!(snapshot.categories.len(), 10);
    assert_eq!(snapshot.transactions.len(), 1);
    assert_eq!(snapshot.budgets.len(), 1);
    assert_eq!(snapshot.goals.len(), 1);

    let parsed: DatabaseSnapshot = serde_json::from_slice(&buffer)?;
    assert_eq!(parsed.version, env!("CARGO_PKG_VERSION"));
    assert_eq!(parsed.transactions[0].category_name.as_deref(), Some("Cafe"));
    assert_eq!(parsed.settings, snapshot.settings);

    Ok(())
}
