mod common;

use chrono::NaiveTime;
use club_rs::club::{
    ClubError,
    billing::{FeeSchedule, compute_monthly_fee},
    dues::{generate_monthly_cuotas, member_cuotas, member_debt, pay_cuota},
    family::{convert_family_to_individual, convert_individual_to_family},
};
use club_rs::entities::member::{MembershipType, Role};
use common::*;

fn schedule() -> FeeSchedule {
    FeeSchedule {
        base_price: 12_000,
        family_discount_percent: 25,
    }
}

#[tokio::test]
async fn test_fee_follows_plan_changes() {
    let db = setup_test_db().await;
    let a = socio(&db, "30000001").await;

    let quote = compute_monthly_fee(&db, &schedule(), a.id).await.unwrap();
    assert_eq!(quote.membership_type, MembershipType::Individual);
    assert_eq!(quote.amount, 12_000);
    assert_eq!(quote.discount_percent, 0);
    assert_eq!(quote.group_size, 1);

    convert_individual_to_family(
        &db,
        a.id,
        vec![new(adult("30000002")), new(child("50000003"))],
        today(),
    )
    .await
    .unwrap();
    let quote = compute_monthly_fee(&db, &schedule(), a.id).await.unwrap();
    assert_eq!(quote.amount, 9_000);
    assert_eq!(quote.discount_percent, 25);
    assert_eq!(quote.group_size, 3);

    convert_family_to_individual(&db, a.id, today()).await.unwrap();
    let quote = compute_monthly_fee(&db, &schedule(), a.id).await.unwrap();
    assert_eq!(quote.amount, 12_000);
}

#[tokio::test]
async fn test_staff_has_no_fee() {
    let db = setup_test_db().await;
    let admin = register(&db, adult("30000011"), Role::Admin).await;
    let err = compute_monthly_fee(&db, &schedule(), admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ClubError::NotASocio { .. }));
}

#[tokio::test]
async fn test_generation_bills_each_socio_once() {
    let db = setup_test_db().await;
    let a = socio(&db, "30000021").await;
    convert_individual_to_family(
        &db,
        a.id,
        vec![new(adult("30000022")), new(child("50000023"))],
        today(),
    )
    .await
    .unwrap();
    let solo = socio(&db, "30000024").await;
    register(&db, adult("30000025"), Role::Entrenador).await;

    let report = generate_monthly_cuotas(&db, &schedule(), 2025, 2, 31)
        .await
        .unwrap();
    assert_eq!(report.created, 4);
    assert_eq!(report.skipped, 0);

    let again = generate_monthly_cuotas(&db, &schedule(), 2025, 2, 31)
        .await
        .unwrap();
    assert_eq!(again.created, 0);
    assert_eq!(again.skipped, 4);

    let cuotas = member_cuotas(&db, a.id).await.unwrap();
    assert_eq!(cuotas.len(), 1);
    assert_eq!(cuotas[0].amount, 9_000);
    assert_eq!(cuotas[0].due_date, date(2025, 2, 28));

    let cuotas = member_cuotas(&db, solo.id).await.unwrap();
    assert_eq!(cuotas[0].amount, 12_000);
}

#[tokio::test]
async fn test_payment_clears_debt() {
    let db = setup_test_db().await;
    let a = socio(&db, "30000031").await;
    generate_monthly_cuotas(&db, &schedule(), 2025, 4, 10)
        .await
        .unwrap();
    generate_monthly_cuotas(&db, &schedule(), 2025, 5, 10)
        .await
        .unwrap();
    generate_monthly_cuotas(&db, &schedule(), 2025, 6, 10)
        .await
        .unwrap();

    let debt = member_debt(&db, a.id, today()).await.unwrap();
    assert_eq!(debt.pending_count, 3);
    assert_eq!(debt.pending_total, 36_000);
    assert_eq!(debt.overdue_count, 2);
    assert_eq!(debt.overdue_total, 24_000);

    let cuotas = member_cuotas(&db, a.id).await.unwrap();
    let paid_at = today().and_time(NaiveTime::MIN);
    for cuota in cuotas.iter().filter(|c| c.month < 6) {
        let paid = pay_cuota(&db, cuota.id, Some(" efectivo ".into()), paid_at)
            .await
            .unwrap();
        assert_eq!(paid.payment_method.as_deref(), Some("efectivo"));
    }

    let debt = member_debt(&db, a.id, today()).await.unwrap();
    assert_eq!(debt.pending_count, 1);
    assert!(!debt.has_overdue());

    let err = pay_cuota(&db, cuotas[1].id, None, paid_at)
        .await
        .unwrap_err();
    assert!(matches!(err, ClubError::CuotaAlreadyPaid { .. }));
    let err = pay_cuota(&db, 999, None, paid_at).await.unwrap_err();
    assert!(matches!(err, ClubError::CuotaNotFound { id: 999 }));
}
