mod common;

use anyhow::Result;
use chrono::NaiveDate;
use common::test_service;
use fintrack::application::{AppError, GoalUpdate};

#[tokio::test]
async fn test_create_goal_and_progress() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let goal = service
        .create_goal(
            "Vacation".into(),
            200000,
            50000,
            Some("Two weeks in Lisbon".into()),
            NaiveDate::from_ymd_opt(2024, 12, 1),
        )
        .await?;

    assert_eq!(goal.progress_percent(), 25);
    assert_eq!(goal.remaining(), 150000);
    assert!(!goal.is_completed);

    let loaded = service.get_goal("Vacation").await?;
    assert_eq!(loaded.description.as_deref(), Some("Two weeks in Lisbon"));
    assert_eq!(loaded.target_date, NaiveDate::from_ymd_opt(2024, 12, 1));

    Ok(())
}

#[tokio::test]
async fn test_goal_validation() -> Result<()> {
    let (service, _temp) = test_service().await?;

    assert!(matches!(
        service.create_goal("Car".into(), 0, 0, None, None).await,
        Err(AppError::InvalidAmount(_))
    ));
    assert!(matches!(
        service.create_goal("Car".into(), 1000, 2000, None, None).await,
        Err(AppError::GoalOverfunded { .. })
    ));

    service.create_goal("Car".into(), 1000, 0, None, None).await?;
    assert!(matches!(
        service.create_goal("Car".into(), 5000, 0, None, None).await,
        Err(AppError::GoalAlreadyExists(_))
    ));
    assert!(matches!(
        service.get_goal("Boat").await,
        Err(AppError::GoalNotFound(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_contribute_until_completed() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .create_goal("Laptop".into(), 150000, 0, None, None)
        .await?;

    let goal = service.contribute("Laptop", 100000).await?;
    assert_eq!(goal.current_cents, 100000);
    assert_eq!(goal.progress_percent(), 66);
    assert!(!goal.is_completed);

    let over = service.contribute("Laptop", 60000).await;
    assert!(matches!(
        over,
        Err(AppError::GoalOverfunded { current: 160000, target: 150000, .. })
    ));

    let goal = service.contribute("Laptop", 50000).await?;
    assert!(goal.is_completed);
    assert_eq!(goal.progress_percent(), 100);
    assert_eq!(goal.remaining(), 0);

    Ok(())
}

#[tokio::test]
async fn test_withdraw_reopens_goal() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .create_goal("Emergency".into(), 100000, 100000, None, None)
        .await?;
    assert!(service.get_goal("Emergency").await?.is_completed);

    let goal = service.withdraw("Emergency", 30000).await?;
    assert_eq!(goal.current_cents, 70000);
    assert!(!goal.is_completed);

    assert!(matches!(
        service.withdraw("Emergency", 70001).await,
        Err(AppError::GoalUnderfunded { current: 70000, requested: 70001, .. })
    ));
    assert!(matches!(
        service.withdraw("Emergency", 0).await,
        Err(AppError::InvalidAmount(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_update_goal() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .create_goal("Bike".into(), 80000, 40000, Some("Road bike".into()), None)
        .await?;

    let goal = service
        .update_goal(
            "Bike",
            GoalUpdate {
                name: Some("Gravel bike".into()),
                target_cents: Some(40000),
                description: Some(None),
                target_date: Some(NaiveDate::from_ymd_opt(2025, 6, 1)),
                ..Default::default()
            },
        )
        .await?;

    assert_eq!(goal.name, "Gravel bike");
    assert!(goal.is_completed);
    assert_eq!(goal.description, None);

    let lowered = service
        .update_goal(
            "Gravel bike",
            GoalUpdate {
                target_cents: Some(10000),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(lowered, Err(AppError::GoalOverfunded { .. })));

    Ok(())
}

#[tokio::test]
async fn test_list_goals_and_overview() -> Result<()> {
    let (service, _temp) = test_service().await?;

    service.create_goal("Done".into(), 1000, 1000, None, None).await?;
    service.create_goal("Vacation".into(), 200000, 50000, None, None).await?;
    service.create_goal("Car".into(), 800000, 150000, None, None).await?;

    let goals = service.list_goals().await?;
    assert_eq!(goals.len(), 3);
    assert_eq!(goals.last().map(|g| g.name.as_str()), Some("Done"));
    assert!(goals[..2].iter().all(|g| !g.is_completed));

    let totals = service.goal_totals().await?;
    assert_eq!(totals.active_goals, 2);
    assert_eq!(totals.total_target, 1000000);
    assert_eq!(totals.total_current, 200000);

    let overview = service.savings_overview().await?;
    assert_eq!(overview.progress_percent, 20.0);

    service.delete_goal("Car").await?;
    assert_eq!(service.goal_totals().await?.active_goals, 1);

    Ok(())
}

#[tokio::test]
async fn test_overview_without_goals() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let overview = service.savings_overview().await?;
    assert_eq!(overview.active_goals, 0);
    assert_eq!(overview.total_target, 0);
    assert_eq!(overview.progress_percent, 0.0);

    Ok(())
}

#[tokio::test]
async fn test_contribute_rejects_overflow() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .create_goal("Pension".into(), i64::MAX, i64::MAX - 1, None, None)
        .await?;

    assert!(matches!(
        service.contribute("Pension", i64::MAX).await,
        Err(AppError::InvalidAmount(_))
    ));
    assert_eq!(service.get_goal("Pension").await?.current_cents, i64::MAX - 1);

    let goal = service.contribute("Pension", 1).await?;
    assert!(goal.is_completed);

    Ok(())
}
