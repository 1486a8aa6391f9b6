mod common;

use club_rs::club::{
    ClubError,
    billing::{FeeSchedule, compute_monthly_fee},
    family::{
        convert_family_to_individual, convert_individual_to_family, create_family_group,
        family_group, remove_member,
    },
    members::{NewMember, find_by_dni, find_member},
};
use club_rs::entities::member::{self, MembershipType, Role};
use common::*;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};

async fn by_dni(db: &DatabaseConnection, dni: &str) -> member::Model {
    find_by_dni(db, dni).await.unwrap().unwrap()
}

async fn member_count(db: &DatabaseConnection) -> u64 {
    member::Entity::find().count(db).await.unwrap()
}

fn assert_individual(member: &member::Model) {
    assert_eq!(member.membership_type, Some(MembershipType::Individual));
    assert_eq!(member.family_group_id, None);
    assert_eq!(member.head_id, None);
}

#[tokio::test]
async fn test_head_with_adult_and_child_share_discounted_fee() {
    let db = setup_test_db().await;
    let a = socio(&db, "30000001").await;

    let created = convert_individual_to_family(
        &db,
        a.id,
        vec![
            new(adult_born("30000002", date(2000, 1, 10))),
            new(child("50000003")),
        ],
        today(),
    )
    .await
    .unwrap();
    assert_eq!(created.member_count, 3);
    assert_eq!(created.head_id, a.id);

    let b = by_dni(&db, "30000002").await;
    let c = by_dni(&db, "50000003").await;
    assert!(b.email.is_some());
    assert!(b.password_hash.is_some());
    assert_eq!(c.email, None);
    assert_eq!(c.password_hash, None);
    for m in [&b, &c] {
        assert!(m.is_familiar());
        assert_eq!(m.family_group_id, Some(created.group_id));
        assert_eq!(m.head_id, Some(a.id));
    }
    assert!(find_member(&db, a.id).await.unwrap().is_family_head());

    let schedule = FeeSchedule::default();
    let fee_a = compute_monthly_fee(&db, &schedule, a.id).await.unwrap();
    let fee_b = compute_monthly_fee(&db, &schedule, b.id).await.unwrap();
    assert_eq!(fee_a.amount, 7_000);
    assert_eq!(fee_a.amount, fee_b.amount);
    assert_eq!(fee_a.group_size, 3);
}

#[tokio::test]
async fn test_create_group_with_new_head() {
    let db = setup_test_db().await;
    let existing_socio = socio(&db, "30000010").await;

    let created = create_family_group(
        &db,
        new(adult("30000011")),
        vec![existing("30000010"), new(child("50000012"))],
        today(),
    )
    .await
    .unwrap();

    let members = family_group(&db, created.group_id).await.unwrap();
    assert_eq!(members.len(), 3);
    assert_eq!(members[0].id, created.head_id);
    assert_eq!(members[0].dni, "30000011");
    assert_eq!(members[0].role, Role::Socio);

    let joined = find_member(&db, existing_socio.id).await.unwrap();
    assert_eq!(joined.head_id, Some(created.head_id));
}

#[tokio::test]
async fn test_leaving_group_of_three_dissolves_it() {
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
    let b = by_dni(&db, "30000022").await;
    let c = by_dni(&db, "50000023").await;

    let report = convert_family_to_individual(&db, b.id, today())
        .await
        .unwrap();

    let mut cascaded: Vec<_> = report.cascaded.iter().map(|m| m.id).collect();
    cascaded.sort();
    assert_eq!(cascaded, vec![a.id, c.id]);
    assert!(report.cascaded.iter().any(|m| m.id == c.id && m.dependent));
    for id in [a.id, b.id, c.id] {
        assert_individual(&find_member(&db, id).await.unwrap());
    }
    assert!(family_group(&db, report.group_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_leaving_group_of_four_keeps_it() {
    let db = setup_test_db().await;
    let a = socio(&db, "30000031").await;
    let created = convert_individual_to_family(
        &db,
        a.id,
        vec![
            new(adult("30000032")),
            new(adult("30000033")),
            new(child("50000034")),
        ],
        today(),
    )
    .await
    .unwrap();
    let b = by_dni(&db, "30000032").await;

    let report = convert_family_to_individual(&db, b.id, today())
        .await
        .unwrap();
    assert!(report.cascaded.is_empty());
    assert_eq!(report.new_head_id, None);

    assert_individual(&find_member(&db, b.id).await.unwrap());
    let remaining = family_group(&db, created.group_id).await.unwrap();
    assert_eq!(remaining.len(), 3);
    assert!(remaining.iter().all(|m| m.is_familiar()));
    assert_eq!(remaining[0].id, a.id);
}

#[tokio::test]
async fn test_too_small_group_writes_nothing() {
    let db = setup_test_db().await;

    let err = create_family_group(
        &db,
        new(adult("30000041")),
        vec![new(adult("30000042"))],
        today(),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        ClubError::InsufficientGroupSize {
            minimum: 3,
            actual: 2
        }
    ));
    assert_eq!(member_count(&db).await, 0);
}

#[tokio::test]
async fn test_duplicate_member_in_request_writes_nothing() {
    let db = setup_test_db().await;
    let taken = socio(&db, "30000051").await;

    // Last member collides with an existing registration.
    let err = create_family_group(
        &db,
        new(adult("30000052")),
        vec![
            new(adult("30000053")),
            new(NewMember {
                email: taken.email.clone(),
                ..adult("30000054")
            }),
        ],
        today(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ClubError::DuplicateEmail { .. }));
    assert_eq!(member_count(&db).await, 1);
}

#[tokio::test]
async fn test_member_already_in_a_family_cannot_join_another() {
    let db = setup_test_db().await;
    let a = socio(&db, "30000061").await;
    convert_individual_to_family(
        &db,
        a.id,
        vec![new(adult("30000062")), new(adult("30000063"))],
        today(),
    )
    .await
    .unwrap();

    let err = create_family_group(
        &db,
        new(adult("30000064")),
        vec![existing("30000062"), new(adult("30000065"))],
        today(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ClubError::AlreadyInFamilyPlan { dni } if dni == "30000062"));
    assert!(find_by_dni(&db, "30000064").await.unwrap().is_none());
}

#[tokio::test]
async fn test_child_cannot_head_a_family() {
    let db = setup_test_db().await;
    let err = create_family_group(
        &db,
        new(child("50000071")),
        vec![new(adult("30000072")), new(adult("30000073"))],
        today(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ClubError::InvalidAge { age: 6, .. }));
}

#[tokio::test]
async fn test_child_cannot_leave_alone() {
    let db = setup_test_db().await;
    let a = socio(&db, "30000081").await;
    convert_individual_to_family(
        &db,
        a.id,
        vec![new(adult("30000082")), new(child("50000083"))],
        today(),
    )
    .await
    .unwrap();
    let c = by_dni(&db, "50000083").await;

    let err = convert_family_to_individual(&db, c.id, today())
        .await
        .unwrap_err();
    assert!(matches!(err, ClubError::InvalidAge { .. }));
    assert!(find_member(&db, c.id).await.unwrap().is_familiar());
}

#[tokio::test]
async fn test_individual_member_cannot_leave_family() {
    let db = setup_test_db().await;
    let a = socio(&db, "30000091").await;
    let err = convert_family_to_individual(&db, a.id, today())
        .await
        .unwrap_err();
    assert!(matches!(err, ClubError::NotInFamilyPlan { .. }));
}

#[tokio::test]
async fn test_removing_head_promotes_oldest_adult() {
    let db = setup_test_db().await;
    let a = socio(&db, "30000101").await;
    let created = convert_individual_to_family(
        &db,
        a.id,
        vec![
            new(adult_born("30000102", date(1995, 1, 1))),
            new(adult_born("30000103", date(1970, 1, 1))),
            new(child("50000104")),
        ],
        today(),
    )
    .await
    .unwrap();
    let oldest = by_dni(&db, "30000103").await;

    let report = remove_member(&db, a.id, today()).await.unwrap();
    assert_eq!(report.new_head_id, Some(oldest.id));
    assert!(report.cascaded.is_empty());
    assert!(find_member(&db, a.id).await.is_err());

    let group = family_group(&db, created.group_id).await.unwrap();
    assert_eq!(group.len(), 3);
    assert_eq!(group[0].id, oldest.id);
    assert!(group[0].is_family_head());
    assert!(group[1..].iter().all(|m| m.head_id == Some(oldest.id)));
}

#[tokio::test]
async fn test_removing_head_with_only_children_left_dissolves_group() {
    let db = setup_test_db().await;
    let a = socio(&db, "30000111").await;
    convert_individual_to_family(
        &db,
        a.id,
        vec![
            new(child("50000112")),
            new(child("50000113")),
            new(child("50000114")),
        ],
        today(),
    )
    .await
    .unwrap();

    let report = remove_member(&db, a.id, today()).await.unwrap();
    assert_eq!(report.cascaded.len(), 3);
    assert!(report.cascaded.iter().all(|m| m.dependent));
    for dni in ["50000112", "50000113", "50000114"] {
        assert_individual(&by_dni(&db, dni).await);
    }
}

#[tokio::test]
async fn test_removing_member_of_group_of_three_cascades() {
    let db = setup_test_db().await;
    let a = socio(&db, "30000121").await;
    convert_individual_to_family(
        &db,
        a.id,
        vec![new(adult("30000122")), new(adult("30000123"))],
        today(),
    )
    .await
    .unwrap();
    let b = by_dni(&db, "30000122").await;

    let report = remove_member(&db, b.id, today()).await.unwrap();
    assert_eq!(report.cascaded.len(), 2);
    assert_individual(&find_member(&db, a.id).await.unwrap());
    assert_individual(&by_dni(&db, "30000123").await);
}

#[tokio::test]
async fn test_removing_unknown_member() {
    let db = setup_test_db().await;
    let err = remove_member(&db, 999, today()).await.unwrap_err();
    assert!(matches!(err, ClubError::MemberNotFound { .. }));
}

#[tokio::test]
async fn test_staff_cannot_join_family() {
    let db = setup_test_db().await;
    register(&db, adult("30000131"), Role::Entrenador).await;
    let err = create_family_group(
        &db,
        new(adult("30000132")),
        vec![existing("30000131"), new(adult("30000133"))],
        today(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ClubError::NotASocio { .. }));
}

/// Every family group holds at least three members, and plan type agrees
/// with the group reference.
async fn assert_groups_consistent(db: &DatabaseConnection, step: &str) {
    let mut sizes = std::collections::HashMap::new();
    for m in member::Entity::find().all(db).await.unwrap() {
        match m.family_group_id {
            Some(group_id) => {
                assert_eq!(m.membership_type, Some(MembershipType::Familiar), "{step}: {}", m.dni);
                *sizes.entry(group_id).or_insert(0) += 1;
            }
            None => assert_ne!(m.membership_type, Some(MembershipType::Familiar), "{step}: {}", m.dni),
        }
    }
    for (group_id, size) in sizes {
        assert!(size >= 3, "{step}: group {group_id} has {size} members");
    }
}

#[tokio::test]
async fn test_group_sizes_hold_across_mutations() {
    let db = setup_test_db().await;
    socio(&db, "30000900").await;
    assert_groups_consistent(&db, "start").await;

    create_family_group(
        &db,
        new(adult("30000901")),
        vec![
            new(adult("30000902")),
            new(child("50000903")),
            new(adult("30000904")),
        ],
        today(),
    )
    .await
    .unwrap();
    assert_groups_consistent(&db, "create").await;

    let leaving = by_dni(&db, "30000904").await;
    convert_family_to_individual(&db, leaving.id, today())
        .await
        .unwrap();
    assert_groups_consistent(&db, "to individual").await;

    let removed = by_dni(&db, "30000902").await;
    remove_member(&db, removed.id, today()).await.unwrap();
    assert_groups_consistent(&db, "remove").await;

    let head = by_dni(&db, "30000901").await;
    assert_individual(&head);
    convert_individual_to_family(
        &db,
        head.id,
        vec![existing("30000904"), new(child("50000905"))],
        today(),
    )
    .await
    .unwrap();
    assert_groups_consistent(&db, "to family").await;

    remove_member(&db, head.id, today()).await.unwrap();
    assert_groups_consistent(&db, "remove head").await;
}
