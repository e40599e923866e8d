//! Property tests: whatever a generated client sends, the service receives.
//!
//! Every operation of `EchoContract` hands its arguments straight back, so a
//! response equal to the input means the request survived encoding, routing
//! and binding intact.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use hermes::prelude::*;
use proptest::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, hermes::WireType)]
#[serde(rename_all = "PascalCase")]
struct Lookup {
    region: String,
    tag: Option<String>,
    limit: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Tagged {
    tags: HashMap<String, i32>,
    page: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Moment {
    day: NaiveDate,
    at: DateTime<Utc>,
    window: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FileRef {
    folder: String,
    name: String,
}

#[hermes::contract(prefix = "echo")]
trait EchoContract {
    async fn list_tags(&self, tags: HashMap<String, i32>, page: i32) -> Outcome<Tagged>;

    async fn get_moment(&self, day: NaiveDate, at: DateTime<Utc>, window: Duration) -> Outcome<Moment>;

    #[operation(method = "GET", path = "files/{folder}")]
    async fn get_file(&self, folder: String, name: String) -> Outcome<FileRef>;

    #[operation(method = "GET", path = "regions/{Region}")]
    async fn find_region(&self, lookup: Lookup) -> Outcome<Lookup>;

    async fn update_lookup(&self, lookup: Lookup) -> Outcome<Lookup>;
}

struct Echo;

impl EchoContract for Echo {
    async fn list_tags(&self, tags: HashMap<String, i32>, page: i32) -> Outcome<Tagged> {
        Ok(Tagged { tags, page })
    }

    async fn get_moment(&self, day: NaiveDate, at: DateTime<Utc>, window: Duration) -> Outcome<Moment> {
        Ok(Moment { day, at, window })
    }

    async fn get_file(&self, folder: String, name: String) -> Outcome<FileRef> {
        Ok(FileRef { folder, name })
    }

    async fn find_region(&self, lookup: Lookup) -> Outcome<Lookup> {
        Ok(lookup)
    }

    async fn update_lookup(&self, lookup: Lookup) -> Outcome<Lookup> {
        Ok(lookup)
    }
}

fn client() -> EchoContractClient {
    let dispatcher = Arc::new(
        Dispatcher::builder()
            .mount(EchoContractService::new(Echo))
            .build()
            .unwrap(),
    );
    EchoContractClient::new(ContractClient::loopback(dispatcher).build())
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

/// Text that still names a path segment once rendered.
fn segment() -> impl Strategy<Value = String> {
    "\\PC{1,12}".prop_filter("blank segments cannot route", |s| !s.trim().is_empty())
}

fn date() -> impl Strategy<Value = NaiveDate> {
    (1970_i32..2100, 1_u32..=12, 1_u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn instant() -> impl Strategy<Value = DateTime<Utc>> {
    (0_i64..4_102_444_800, 0_u32..1_000_000_000)
        .prop_map(|(secs, nanos)| DateTime::from_timestamp(secs, nanos).unwrap())
}

fn lookup() -> impl Strategy<Value = Lookup> {
    (segment(), proptest::option::of("\\PC{0,12}"), proptest::option::of(any::<i32>()))
        .prop_map(|(region, tag, limit)| Lookup { region, tag, limit })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_map_and_sibling_scalar_arrive_separately(
        tags in proptest::collection::hash_map("\\PC{0,8}", any::<i32>(), 0..6),
        page in any::<i32>(),
    ) {
        let echoed = block_on(client().list_tags(tags.clone(), page)).unwrap();
        prop_assert_eq!(echoed, Tagged { tags, page });
    }

    #[test]
    fn prop_dates_and_durations_survive(
        day in date(),
        at in instant(),
        millis in any::<u64>(),
    ) {
        let window = Duration::from_millis(millis);
        let echoed = block_on(client().get_moment(day, at, window)).unwrap();
        prop_assert_eq!(echoed, Moment { day, at, window });
    }

    #[test]
    fn prop_text_in_route_and_query(folder in segment(), name in "\\PC{0,16}") {
        let echoed = block_on(client().get_file(folder.clone(), name.clone())).unwrap();
        prop_assert_eq!(echoed, FileRef { folder, name });
    }

    #[test]
    fn prop_structured_get_splits_route_and_query(lookup in lookup()) {
        let echoed = block_on(client().find_region(lookup.clone())).unwrap();
        prop_assert_eq!(echoed, lookup);
    }

    #[test]
    fn prop_structured_body(lookup in lookup()) {
        let echoed = block_on(client().update_lookup(lookup.clone())).unwrap();
        prop_assert_eq!(echoed, lookup);
    }
}

#[tokio::test]
async fn test_blank_route_values_are_rejected_before_sending() {
    let client = client();

    let err = client
        .get_file(String::new(), "readme".to_string())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.message(), "route parameter 'folder' must not be empty");

    let err = client
        .find_region(Lookup {
            region: "  ".to_string(),
            tag: None,
            limit: Some(5),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.message(), "route parameter 'Region' must not be empty");
}

#[tokio::test]
async fn test_oversized_duration_is_a_validation_error() {
    let err = client()
        .get_moment(
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            Utc::now(),
            Duration::MAX,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
