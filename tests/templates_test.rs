mod common;

use anyhow::Result;
use common::{StandardSetup, parse_date, test_service};
use fintrack::application::{AppError, SettingsUpdate};
use fintrack::Repository;
use fintrack::domain::{Account, DEFAULT_CURRENCY, EntryKind, default_categories};
use tempfile::TempDir;

#[tokio::test]
async fn test_apply_template_records_transaction() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_all(&service).await?;

    service
        .create_template(
            "Rent".into(),
            EntryKind::Expense,
            120000,
            Some("Checking".into()),
            Some("Rent".into()),
            Some("Monthly rent".into()),
        )
        .await?;

    let details = service
        .apply_template("Rent", None, None, Some(parse_date("2024-03-01")))
        .await?;
    assert_eq!(details.account_name, "Checking");
    assert_eq!(details.category_name.as_deref(), Some("Rent"));
    assert_eq!(details.transaction.amount_cents, 120000);
    assert_eq!(details.transaction.kind, EntryKind::Expense);
    assert_eq!(details.transaction.description.as_deref(), Some("Monthly rent"));

    let overridden = service
        .apply_template("Rent", Some("Cash".into()), Some(125000), None)
        .await?;
    assert_eq!(overridden.account_name, "Cash");
    assert_eq!(overridden.transaction.amount_cents, 125000);

    assert_eq!(service.list_transactions(Default::default()).await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_template_without_account_needs_one() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_all(&service).await?;

    service
        .create_template("Coffee".into(), EntryKind::Expense, 350, None, Some("Dining".into()), None)
        .await?;

    assert!(matches!(
        service.apply_template("Coffee", None, None, None).await,
        Err(AppError::TemplateWithoutAccount(_))
    ));
    let details = service
        .apply_template("Coffee", Some("Cash".into()), None, None)
        .await?;
    assert_eq!(details.transaction.amount_cents, 350);

    Ok(())
}

#[tokio::test]
async fn test_template_validation_and_delete() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_all(&service).await?;

    assert!(matches!(
        service
            .create_template("Pay".into(), EntryKind::Income, 1000, None, Some("Rent".into()), None)
            .await,
        Err(AppError::CategoryKindMismatch { .. })
    ));
    assert!(matches!(
        service
            .create_template("Pay".into(), EntryKind::Income, 0, None, None, None)
            .await,
        Err(AppError::InvalidAmount(_))
    ));

    service
        .create_template("Pay".into(), EntryKind::Income, 300000, None, Some("Salary".into()), None)
        .await?;
    assert!(matches!(
        service
            .create_template("Pay".into(), EntryKind::Income, 1, None, None, None)
            .await,
        Err(AppError::TemplateAlreadyExists(_))
    ));
    assert_eq!(service.list_templates().await?.len(), 1);

    service.delete_template("Pay").await?;
    assert!(service.list_templates().await?.is_empty());
    assert!(matches!(
        service.apply_template("Pay", None, None, None).await,
        Err(AppError::TemplateNotFound(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_settings_defaults_and_update() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let settings = service.settings().await?;
    assert_eq!(settings.currency, DEFAULT_CURRENCY);
    assert_eq!(settings.monthly_income_cents, 0);

    let updated = service
        .update_settings(SettingsUpdate {
            monthly_income_cents: Some(350000),
            savings_target_cents: Some(50000),
            ..Default::default()
        })
        .await?;
    assert_eq!(updated.currency, DEFAULT_CURRENCY);
    assert_eq!(service.settings().await?, updated);

    assert!(matches!(
        service
            .update_settings(SettingsUpdate {
                savings_target_cents: Some(-1),
                ..Default::default()
            })
            .await,
        Err(AppError::InvalidAmount(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_seed_defaults_only_once() -> Result<()> {
    let (service, _temp) = test_service().await?;

    assert!(service.seed_defaults().await?);

    let expense = service.list_categories(Some(EntryKind::Expense), false).await?;
    let income = service.list_categories(Some(EntryKind::Income), false).await?;
    assert_eq!(expense.len(), 7);
    assert_eq!(income.len(), 3);
    assert!(expense.iter().all(|c| c.is_default));

    let accounts = service.all_account_summaries().await?;
    let names: Vec<_> = accounts.iter().map(|s| s.account.name.as_str()).collect();
    assert_eq!(names, ["Cash", "Main card", "Savings"]);
    assert!(accounts.iter().all(|s| s.balance == 0));

    assert!(!service.seed_defaults().await?);
    assert_eq!(service.list_categories(None, true).await?.len(), 10);

    Ok(())
}

#[tokio::test]
async fn test_seed_rolls_back_on_failure() -> Result<()> {
    let temp = TempDir::new()?;
    let db_path = temp.path().join("seed.db");
    let repo = Repository::init(&format!("sqlite:{}?mode=rwc", db_path.display())).await?;

    // Second account collides on the unique name after the categories went in.
    let accounts = [
        Account::new("Cash".into(), DEFAULT_CURRENCY.into()),
        Account::new("Cash".into(), DEFAULT_CURRENCY.into()),
    ];
    assert!(repo.seed(&default_categories(), &accounts).await.is_err());
    assert_eq!(repo.count_categories().await?, 0);
    assert_eq!(repo.count_accounts().await?, 0);

    repo.seed(&default_categories(), &accounts[..1]).await?;
    assert_eq!(repo.count_categories().await?, 10);
    assert_eq!(repo.count_accounts().await?, 1);

    Ok(())
}
