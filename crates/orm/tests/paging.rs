//! Integration tests for paging arbitrary statements.

#![allow(missing_docs)]

mod common;

use common::{ConflictCustomer1, CustomerUser, Gender, USER_COUNT, User, database};
use rowmap::{Error, RowNumber, params};

fn ids(users: &[User]) -> Vec<i32> {
    users.iter().map(|u| u.user_id).collect()
}

#[tokio::test]
async fn second_page_of_five() {
    let db = database().await;

    let page = db
        .page::<User>(
            2,
            5,
            "SELECT * FROM Users WHERE UserId <= ?1 ORDER BY UserId",
            params![15].unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(page.items().len(), 5);
    assert_eq!(page.current_page(), 2);
    assert_eq!(page.items_per_page(), 5);
    assert_eq!(page.total_items(), USER_COUNT);
    assert_eq!(page.total_pages(), 3);
    assert_eq!(ids(page.items()), [6, 7, 8, 9, 10]);
}

#[tokio::test]
async fn page_without_order_by() {
    let db = database().await;

    let page = db.page::<User>(2, 5, "SELECT * FROM Users", vec![]).await.unwrap();

    assert_eq!(page.items().len(), 5);
    assert_eq!(page.total_items(), USER_COUNT);
    assert_eq!(page.total_pages(), 3);
}

#[tokio::test]
async fn qualified_star_and_aliases() {
    let db = database().await;

    let page = db
        .page::<User>(
            1,
            5,
            "SELECT u.*, u.Name AS Nickname FROM Users u WHERE u.Age > ?1 ORDER BY u.UserId DESC",
            params![25].unwrap(),
        )
        .await
        .unwrap();

    // ages are 21..=35
    assert_eq!(page.total_items(), 10);
    assert_eq!(page.total_pages(), 2);
    assert_eq!(ids(page.items()), [15, 14, 13, 12, 11]);
}

#[tokio::test]
async fn distinct_and_grouped_statements_are_counted_by_wrapping() {
    let db = database().await;

    let page = db
        .page::<Gender>(1, 5, "SELECT DISTINCT IsMale FROM Users ORDER BY IsMale", vec![])
        .await
        .unwrap();
    assert_eq!(page.total_items(), 2);
    assert_eq!(page.total_pages(), 1);
    assert_eq!(page.items().iter().map(|g| g.is_male).collect::<Vec<_>>(), [false, true]);

    let page = db
        .page::<Gender>(1, 1, "SELECT IsMale FROM Users GROUP BY IsMale ORDER BY IsMale", vec![])
        .await
        .unwrap();
    assert_eq!(page.total_items(), 2);
    assert_eq!(page.total_pages(), 2);
    assert_eq!(page.items().len(), 1);
}

#[tokio::test]
async fn exact_multiple_has_no_spurious_page() {
    let db = database().await;
    let sql = "SELECT * FROM Users ORDER BY UserId";

    let last = db.page::<User>(3, 5, sql, vec![]).await.unwrap();
    assert_eq!(last.items().len(), 5);
    assert_eq!(last.total_pages(), 3);

    let past_end = db.page::<User>(4, 5, sql, vec![]).await.unwrap();
    assert!(past_end.items().is_empty());
    assert_eq!(past_end.current_page(), 4);
    assert_eq!(past_end.total_items(), USER_COUNT);
    assert_eq!(past_end.total_pages(), 3);
}

#[tokio::test]
async fn pages_partition_the_result() {
    let db = database().await;
    let sql = "SELECT * FROM Users ORDER BY UserId";

    let mut seen = Vec::new();
    let first = db.page::<User>(1, 4, sql, vec![]).await.unwrap();
    for page in 1..=first.total_pages() {
        let page = db.page::<User>(page, 4, sql, vec![]).await.unwrap();
        seen.extend(ids(page.items()));
    }

    assert_eq!(first.total_pages(), 4);
    assert_eq!(seen, (1..=15).collect::<Vec<_>>());
}

#[tokio::test]
async fn joined_page_fills_related_objects() {
    let db = database().await;

    let page = db
        .page::<CustomerUser>(
            1,
            5,
            "SELECT u.UserId, u.Name, e.ExtraUserInfoId AS ExtraUserInfo__ExtraUserInfoId, \
             e.Email AS ExtraUserInfo__Email \
             FROM Users u INNER JOIN ExtraUserInfos e ON e.UserId = u.UserId \
             ORDER BY u.UserId",
            vec![],
        )
        .await
        .unwrap();

    assert_eq!(page.total_items(), USER_COUNT);
    let first = &page.items()[0];
    assert_eq!(first.user_id, 1);
    assert_eq!(first.name, "Name1");

    let info = first.extra_user_info.as_ref().unwrap();
    assert_eq!(info.extra_user_info_id, 15);
    assert_eq!(info.email, "email1@email.com");
}

#[tokio::test]
async fn conflicting_members_with_prefix_are_paged() {
    let db = database().await;

    let page = db
        .page::<ConflictCustomer1>(
            2,
            5,
            "SELECT u.UserId, u.Name, e.ExtraUserInfoId AS ConflictCustomer2__UserId, \
             e.Email AS ConflictCustomer2__Email \
             FROM Users u INNER JOIN ExtraUserInfos e ON e.UserId = u.UserId \
             ORDER BY u.UserId",
            vec![],
        )
        .await
        .unwrap();

    assert_eq!(page.total_pages(), 3);
    let customer = &page.items()[0];
    assert_eq!(customer.user_id, 6);
    assert_eq!(customer.name, "Name6");

    let related = customer.conflict_customer2.as_ref().unwrap();
    assert_eq!(related.user_id, 10);
    assert_eq!(related.email, "email6@email.com");
}

#[tokio::test]
async fn row_number_strategy() {
    let db = database().await.window_strategy(RowNumber);

    let page = db
        .page::<User>(2, 5, "SELECT u.* FROM Users u ORDER BY u.UserId", vec![])
        .await
        .unwrap();

    assert_eq!(page.total_items(), USER_COUNT);
    assert_eq!(ids(page.items()), [6, 7, 8, 9, 10]);
}

#[tokio::test]
async fn parameters_in_the_projection_are_counted() {
    for db in [database().await, database().await.window_strategy(RowNumber)] {
        let page = db
            .page::<User>(
                1,
                5,
                "SELECT UserId = ?2 AS IsMe, * FROM Users WHERE UserId <= ?1 ORDER BY UserId",
                params![10, 3].unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(page.total_items(), 10);
        assert_eq!(page.total_pages(), 2);
        assert_eq!(ids(page.items()), [1, 2, 3, 4, 5]);
    }
}

#[tokio::test]
async fn parameters_in_the_ordering_are_counted() {
    for db in [database().await, database().await.window_strategy(RowNumber)] {
        let page = db
            .page::<User>(
                1,
                5,
                "SELECT * FROM Users WHERE UserId <= ?1 \
                 ORDER BY CASE WHEN UserId = ?2 THEN 0 ELSE 1 END, UserId",
                params![10, 3].unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(page.total_items(), 10);
        assert_eq!(ids(page.items()), [3, 1, 2, 4, 5]);
    }
}

#[tokio::test]
async fn trailing_comment_after_terminator() {
    let db = database().await;

    let page = db
        .page::<User>(1, 5, "SELECT * FROM Users ORDER BY UserId; -- first page", vec![])
        .await
        .unwrap();

    assert_eq!(page.total_items(), USER_COUNT);
    assert_eq!(ids(page.items()), [1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn window_without_count() {
    let db = database().await;
    let sql = "SELECT * FROM Users ORDER BY UserId";

    let users = db.skip_take::<User>(5, 3, sql, vec![]).await.unwrap();
    assert_eq!(ids(&users), [6, 7, 8]);

    let users = db.fetch_page::<User>(3, 5, sql, vec![]).await.unwrap();
    assert_eq!(ids(&users), [11, 12, 13, 14, 15]);
}

#[tokio::test]
async fn invalid_requests_fail_before_execution() {
    let db = database().await;

    let err = db.page::<User>(1, 5, "SELECT * FROM Users LIMIT 3", vec![]).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::MalformedStatement { .. })));

    let err = db.page::<User>(0, 5, "SELECT * FROM Users", vec![]).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::InvalidPage(_))));

    let err = db.page::<User>(1, 5, "SELECT * FROM Missing", vec![]).await.unwrap_err();
    assert!(err.downcast_ref::<Error>().is_none());
    assert_eq!(err.to_string(), "count query failed");
}
