//! Common test helpers shared across integration tests.
#![allow(dead_code)]

use chrono::NaiveDate;
use rowmap::{Database, poco};
use rowmap_sql::{Backend, ConnectOptions, DataType, SqlDefault};
use tracing_subscriber::EnvFilter;

pub const USER_COUNT: u64 = 15;

poco! {
    #[derive(Debug, Clone, Default)]
    pub struct User {
        pub user_id: i32,
        pub name: String,
        pub age: i32,
        pub date_of_birth: Option<NaiveDate>,
        pub savings: f64,
        pub is_male: bool,
    }
}

poco! {
    #[derive(Debug, Clone, Default)]
    pub struct ExtraUserInfo {
        pub extra_user_info_id: i32,
        pub user_id: i32,
        pub email: String,
        pub children: i32,
    }
}

poco! {
    references = [extra_user_info: ExtraUserInfo],
    #[derive(Debug, Clone, Default)]
    pub struct CustomerUser {
        pub user_id: i32,
        pub name: String,
    }
}

poco! {
    #[derive(Debug, Clone, Default)]
    pub struct ConflictCustomer2 {
        pub user_id: i32,
        pub email: String,
    }
}

poco! {
    references = [conflict_customer2: ConflictCustomer2],
    #[derive(Debug, Clone, Default)]
    pub struct ConflictCustomer1 {
        pub user_id: i32,
        pub name: String,
    }
}

poco! {
    references = [home: ExtraUserInfo, work: ExtraUserInfo],
    #[derive(Debug, Clone, Default)]
    pub struct UserWithContacts {
        pub user_id: i32,
        pub name: String,
    }
}

poco! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Money {
        pub value: f64,
        pub code: String,
    }
}

poco! {
    references = [money: Money],
    #[derive(Debug, Clone, Default)]
    pub struct Wallet {
        pub id: i32,
        pub name: String,
    }
}

poco! {
    read_only = [name2],
    #[derive(Debug, Clone, Default)]
    pub struct NamesOnly {
        pub name1: String,
        pub name2: String,
    }
}

poco! {
    #[derive(Debug, Clone, Default)]
    pub struct Gender {
        pub is_male: bool,
    }
}

poco! {
    #[derive(Debug, Clone, Default)]
    pub struct Tally {
        pub id: u8,
        pub total: usize,
        pub delta: i8,
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A private in-memory database seeded with 15 users and one extra info row
/// per user.
///
/// Extra infos are inserted in reverse, so user `n` owns info `16 - n`.
pub async fn database() -> Database {
    init_tracing();

    let conn = SqlDefault::connect_with(ConnectOptions {
        database: ":memory:".to_string(),
    })
    .await
    .expect("connect");
    let db = Database::new(conn);

    db.execute(
        "CREATE TABLE Users (
            UserId INTEGER PRIMARY KEY,
            Name TEXT NOT NULL,
            Age INTEGER NOT NULL,
            DateOfBirth TEXT,
            Savings REAL NOT NULL,
            IsMale INTEGER NOT NULL
        )",
        vec![],
    )
    .await
    .expect("create users");

    db.execute(
        "CREATE TABLE ExtraUserInfos (
            ExtraUserInfoId INTEGER PRIMARY KEY,
            UserId INTEGER NOT NULL,
            Email TEXT NOT NULL,
            Children INTEGER NOT NULL
        )",
        vec![],
    )
    .await
    .expect("create extra user infos");

    for i in 1..=15 {
        db.execute(
            "INSERT INTO Users (UserId, Name, Age, DateOfBirth, Savings, IsMale) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            vec![
                DataType::Int32(Some(i)),
                DataType::Str(Some(format!("Name{i}"))),
                DataType::Int32(Some(20 + i)),
                DataType::Str(Some(format!("1990-01-{i:02}"))),
                DataType::Double(Some(50.0 + f64::from(i))),
                DataType::Boolean(Some(i % 2 == 0)),
            ],
        )
        .await
        .expect("insert user");
    }

    for i in (1..=15).rev() {
        db.execute(
            "INSERT INTO ExtraUserInfos (UserId, Email, Children) VALUES (?1, ?2, ?3)",
            vec![
                DataType::Int32(Some(i)),
                DataType::Str(Some(format!("email{i}@email.com"))),
                DataType::Int32(Some(i % 3)),
            ],
        )
        .await
        .expect("insert extra user info");
    }

    db
}
