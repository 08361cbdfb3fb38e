use chrono::{Duration, Utc};

use crate::marketplace::identity::UserId;
use crate::marketplace::posts::domain::{ApplicationStatus, PostStatus};
use crate::marketplace::posts::lifecycle::{
    effective_status, resolve_application, submit_application, withdraw_application,
    ApplicationDecision, ApplicationDetails, LifecycleError,
};

use super::common::bare_post;

#[test]
fn active_post_accepts_one_application_per_tutor() {
    let mut post = bare_post(UserId::generate());
    let tutor = UserId::generate();
    let now = Utc::now();

    submit_application(&mut post, tutor, ApplicationDetails::default(), now)
        .expect("first application");
    let error = submit_application(&mut post, tutor, ApplicationDetails::default(), now)
        .expect_err("duplicate application");

    assert_eq!(error, LifecycleError::AlreadyApplied);
    assert_eq!(post.applications.len(), 1);
    assert_eq!(post.applications[0].status, ApplicationStatus::Pending);
}

#[test]
fn duplicate_check_covers_withdrawn_applications() {
    let mut post = bare_post(UserId::generate());
    let tutor = UserId::generate();
    let now = Utc::now();

    submit_application(&mut post, tutor, ApplicationDetails::default(), now).expect("apply");
    withdraw_application(&mut post, tutor, now).expect("withdraw");

    let error = submit_application(&mut post, tutor, ApplicationDetails::default(), now)
        .expect_err("re-apply after withdrawal");
    assert_eq!(error, LifecycleError::AlreadyApplied);
}

#[test]
fn accepting_fills_post_and_sweeps_pending_siblings() {
    let mut post = bare_post(UserId::generate());
    let now = Utc::now();
    let (first, second, third) = (
        UserId::generate(),
        UserId::generate(),
        UserId::generate(),
    );

    let accepted =
        submit_application(&mut post, first, ApplicationDetails::default(), now).expect("apply");
    submit_application(&mut post, second, ApplicationDetails::default(), now).expect("apply");
    let rejected =
        submit_application(&mut post, third, ApplicationDetails::default(), now).expect("apply");

    resolve_application(&mut post, rejected, ApplicationDecision::Rejected, now)
        .expect("reject third");
    resolve_application(&mut post, accepted, ApplicationDecision::Accepted, now)
        .expect("accept first");

    assert_eq!(post.status, PostStatus::Filled);
    assert_eq!(post.selected_tutor, Some(first));

    let statuses: Vec<ApplicationStatus> = post
        .applications
        .iter()
        .map(|application| application.status)
        .collect();
    assert_eq!(
        statuses,
        vec![
            ApplicationStatus::Accepted,
            ApplicationStatus::Rejected,
            ApplicationStatus::Rejected,
        ]
    );
    let accepted_count = post
        .applications
        .iter()
        .filter(|application| application.status == ApplicationStatus::Accepted)
        .count();
    assert_eq!(accepted_count, 1);
}

#[test]
fn rejecting_leaves_post_and_siblings_untouched() {
    let mut post = bare_post(UserId::generate());
    let now = Utc::now();
    let first = UserId::generate();
    let second = UserId::generate();

    let target =
        submit_application(&mut post, first, ApplicationDetails::default(), now).expect("apply");
    submit_application(&mut post, second, ApplicationDetails::default(), now).expect("apply");

    resolve_application(&mut post, target, ApplicationDecision::Rejected, now).expect("reject");

    assert_eq!(post.status, PostStatus::Active);
    assert_eq!(post.selected_tutor, None);
    assert_eq!(post.applications[0].status, ApplicationStatus::Rejected);
    assert_eq!(post.applications[1].status, ApplicationStatus::Pending);
}

#[test]
fn repeating_a_decision_is_a_no_op() {
    let mut post = bare_post(UserId::generate());
    let now = Utc::now();
    let application =
        submit_application(&mut post, UserId::generate(), ApplicationDetails::default(), now)
            .expect("apply");

    resolve_application(&mut post, application, ApplicationDecision::Accepted, now)
        .expect("accept");
    resolve_application(&mut post, application, ApplicationDecision::Accepted, now)
        .expect("re-accept is idempotent");

    assert_eq!(post.status, PostStatus::Filled);
}

#[test]
fn accepting_a_second_application_on_a_filled_post_is_refused() {
    let mut post = bare_post(UserId::generate());
    let now = Utc::now();
    let first =
        submit_application(&mut post, UserId::generate(), ApplicationDetails::default(), now)
            .expect("apply");
    let second =
        submit_application(&mut post, UserId::generate(), ApplicationDetails::default(), now)
            .expect("apply");

    resolve_application(&mut post, first, ApplicationDecision::Accepted, now).expect("accept");
    let error = resolve_application(&mut post, second, ApplicationDecision::Accepted, now)
        .expect_err("second accept");

    assert_eq!(error, LifecycleError::PostAlreadyFilled);
    assert_eq!(post.selected_tutor.is_some(), post.status == PostStatus::Filled);
}

#[test]
fn terminal_applications_cannot_be_flipped() {
    let mut post = bare_post(UserId::generate());
    let now = Utc::now();
    let tutor = UserId::generate();
    let application =
        submit_application(&mut post, tutor, ApplicationDetails::default(), now).expect("apply");

    withdraw_application(&mut post, tutor, now).expect("withdraw");

    let error = resolve_application(&mut post, application, ApplicationDecision::Accepted, now)
        .expect_err("accept after withdrawal");
    assert_eq!(error, LifecycleError::AlreadyResolved);

    let error = withdraw_application(&mut post, tutor, now).expect_err("double withdraw");
    assert_eq!(error, LifecycleError::AlreadyResolved);
}

#[test]
fn expired_posts_refuse_applications() {
    let mut post = bare_post(UserId::generate());
    post.expires_at = Utc::now() - Duration::days(1);
    let now = Utc::now();

    assert_eq!(effective_status(&post, now), PostStatus::Expired);
    // Stored status stays untouched by the read.
    assert_eq!(post.status, PostStatus::Active);

    let error =
        submit_application(&mut post, UserId::generate(), ApplicationDetails::default(), now)
            .expect_err("apply to expired post");
    assert_eq!(error, LifecycleError::PostNotActive);
    assert!(post.applications.is_empty());
}

#[test]
fn unknown_application_reports_not_found() {
    let mut post = bare_post(UserId::generate());
    let now = Utc::now();
    submit_application(&mut post, UserId::generate(), ApplicationDetails::default(), now)
        .expect("apply");

    let error = resolve_application(
        &mut post,
        crate::marketplace::posts::domain::ApplicationId::generate(),
        ApplicationDecision::Rejected,
        now,
    )
    .expect_err("unknown application");
    assert_eq!(error, LifecycleError::ApplicationNotFound);

    let error = withdraw_application(&mut post, UserId::generate(), now)
        .expect_err("withdraw without application");
    assert_eq!(error, LifecycleError::ApplicationNotFound);
}
