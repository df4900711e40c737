mod common;

use anyhow::Result;
use common::{StandardSetup, record, test_service};
use fintrack::application::{AccountUpdate, AppError, CategoryUpdate, SettingsUpdate};
use fintrack::domain::EntryKind;

#[tokio::test]
async fn test_create_and_list_accounts() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_accounts(&service).await?;

    let accounts = service.list_accounts(false).await?;
    assert_eq!(accounts.len(), 2);

    let checking = service.get_account("Checking").await?;
    assert_eq!(checking.currency, "EUR");
    assert_eq!(checking.opening_balance_cents, 100000);
    assert!(checking.is_active);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_account_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_accounts(&service).await?;

    let result = service.create_account("Cash".into(), None, 0).await;
    assert!(matches!(result, Err(AppError::AccountAlreadyExists(name)) if name == "Cash"));

    Ok(())
}

#[tokio::test]
async fn test_new_account_uses_settings_currency() -> Result<()> {
    let (service, _temp) = test_service().await?;

    service
        .update_settings(SettingsUpdate {
            currency: Some("USD".into()),
            ..Default::default()
        })
        .await?;
    let account = service.create_account("Wallet".into(), None, 0).await?;
    assert_eq!(account.currency, "USD");

    Ok(())
}

#[tokio::test]
async fn test_balance_is_derived_from_transactions() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_all(&service).await?;

    record(&service, "Checking", EntryKind::Income, 250000, Some("Salary"), "2024-03-01").await?;
    record(&service, "Checking", EntryKind::Expense, 4550, Some("Groceries"), "2024-03-02").await?;
    record(&service, "Checking", EntryKind::Expense, 1200, None, "2024-03-03").await?;
    record(&service, "Cash", EntryKind::Expense, 800, Some("Dining"), "2024-03-03").await?;

    let summary = service.account_summary("Checking").await?;
    assert_eq!(summary.total_income, 250000);
    assert_eq!(summary.total_expense, 5750);
    assert_eq!(summary.balance, 100000 + 250000 - 5750);
    assert_eq!(summary.transaction_count, 3);

    let cash = service.account_summary("Cash").await?;
    assert_eq!(cash.balance, -800);

    let all = service.all_account_summaries().await?;
    assert_eq!(all.len(), 2);
    let total: i64 = all.iter().map(|s| s.balance).sum();
    assert_eq!(total, 100000 + 250000 - 5750 - 800);

    Ok(())
}

#[tokio::test]
async fn test_adjust_balance_changes_opening_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_accounts(&service).await?;

    let summary = service.adjust_balance("Checking", -2500).await?;
    assert_eq!(summary.balance, 97500);
    assert_eq!(summary.transaction_count, 0);

    Ok(())
}

#[tokio::test]
async fn test_update_account_rename() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_accounts(&service).await?;

    let renamed = service
        .update_account(
            "Cash",
            AccountUpdate {
                name: Some("Pocket".into()),
                color: Some("#FF0000".into()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(renamed.name, "Pocket");
    assert_eq!(service.get_account("Pocket").await?.color, "#FF0000");
    assert!(matches!(
        service.get_account("Cash").await,
        Err(AppError::AccountNotFound(_))
    ));

    let clash = service
        .update_account(
            "Pocket",
            AccountUpdate {
                name: Some("Checking".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(clash, Err(AppError::AccountAlreadyExists(_))));

    Ok(())
}

#[tokio::test]
async fn test_archived_account_hidden_and_blocked() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_all(&service).await?;

    service.archive_account("Cash").await?;

    assert_eq!(service.list_accounts(false).await?.len(), 1);
    assert_eq!(service.list_accounts(true).await?.len(), 2);

    let result = record(&service, "Cash", EntryKind::Expense, 100, None, "2024-03-01").await;
    let err = result.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::AccountArchived(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_delete_account_removes_its_transactions() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_all(&service).await?;

    record(&service, "Cash", EntryKind::Expense, 500, Some("Dining"), "2024-03-01").await?;
    record(&service, "Checking", EntryKind::Expense, 700, Some("Dining"), "2024-03-01").await?;

    service.delete_account("Cash").await?;

    let remaining = service.list_transactions(Default::default()).await?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].account_name, "Checking");

    Ok(())
}

#[tokio::test]
async fn test_categories_by_kind() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_categories(&service).await?;

    let expense = service.list_categories(Some(EntryKind::Expense), false).await?;
    assert_eq!(expense.len(), 3);
    let income = service.list_categories(Some(EntryKind::Income), false).await?;
    assert_eq!(income.len(), 1);
    assert_eq!(income[0].name, "Salary");

    let duplicate = service
        .create_category("Rent".into(), EntryKind::Expense, None, None)
        .await;
    assert!(matches!(duplicate, Err(AppError::CategoryAlreadyExists(_))));

    Ok(())
}

#[tokio::test]
async fn test_update_and_archive_category() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_all(&service).await?;

    service
        .update_category(
            "Dining",
            CategoryUpdate {
                name: Some("Restaurants".into()),
                icon: Some("fork.knife".into()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(service.get_category("Restaurants").await?.icon, "fork.knife");

    service.archive_category("Restaurants").await?;
    assert_eq!(service.list_categories(Some(EntryKind::Expense), false).await?.len(), 2);
    assert_eq!(service.list_categories(Some(EntryKind::Expense), true).await?.len(), 3);

    let result = record(&service, "Cash", EntryKind::Expense, 100, Some("Restaurants"), "2024-03-01").await;
    assert!(matches!(
        result.unwrap_err().downcast_ref::<AppError>(),
        Some(AppError::CategoryArchived(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_delete_category_uncategorizes_transactions() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_all(&service).await?;

    let details = record(&service, "Cash", EntryKind::Expense, 900, Some("Dining"), "2024-03-01").await?;
    service.delete_category("Dining").await?;

    let after = service.get_transaction_details(details.transaction.id).await?;
    assert_eq!(after.transaction.category_id, None);
    assert_eq!(after.category_name, None);
    assert_eq!(after.transaction.amount_cents, 900);

    Ok(())
}

#[tokio::test]
async fn test_adjust_balance_rejects_overflow() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_accounts(&service).await?;

    assert!(matches!(
        service.adjust_balance("Checking", i64::MAX).await,
        Err(AppError::InvalidAmount(_))
    ));
    assert_eq!(service.account_summary("Checking").await?.balance, 100000);

    Ok(())
}
