//! Integration tests for the upload → cache → display flow.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use proptest::prelude::*;
use serde_json::json;
use schema_inspector::{
    CardBody, CardControl, CacheStatus, CodeHighlightRequest, DisplayMode, FetchError,
    HighlightedCode, SchemaFile, SchemaResult, SchemaService, Session, UploadAffordance,
    SCHEMA_CACHE_TAG,
};

/// Service double answering uploads from a queue and counting highlights.
#[derive(Default)]
struct FakeService {
    uploads: RefCell<VecDeque<Result<SchemaResult, FetchError>>>,
    highlight_calls: Cell<usize>,
    highlight_fails: Cell<bool>,
}

impl FakeService {
    fn replying(replies: Vec<Result<SchemaResult, FetchError>>) -> Self {
        Self {
            uploads: RefCell::new(replies.into()),
            ..Self::default()
        }
    }
}

impl SchemaService for FakeService {
    fn visualise(&self, _file: &SchemaFile) -> Result<SchemaResult, FetchError> {
        self.uploads
            .borrow_mut()
            .pop_front()
            .expect("unexpected upload")
    }

    fn code_highlight(
        &self,
        request: &CodeHighlightRequest<'_>,
    ) -> Result<HighlightedCode, FetchError> {
        self.highlight_calls.set(self.highlight_calls.get() + 1);
        if self.highlight_fails.get() {
            return Err(FetchError::Status {
                url: "http://localhost/api/v1/code_highlight".into(),
                status: 500,
            });
        }
        Ok(HighlightedCode {
            html: format!(
                r#"<span class="model-name">{}</span><script>alert(1)</script>"#,
                request.span.start
            ),
        })
    }
}

fn user_schema() -> SchemaResult {
    serde_json::from_value(json!({
        "schema": "model User {id Int}",
        "result": [{
            "id": "m1",
            "name": "User",
            "span": { "start": 0, "end": 19 },
            "fields": [{
                "name": "id",
                "type": "Int",
                "is_index": false,
                "constraints": [],
                "relation_ship_fields": [],
                "relation_ship_references": []
            }],
            "code": "model User {id Int}"
        }]
    }))
    .unwrap()
}

fn blog_schema(ids: &[&str]) -> SchemaResult {
    let models: Vec<_> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            json!({
                "id": id,
                "name": format!("Model{}", i),
                "span": { "start": i * 10, "end": i * 10 + 9 },
                "fields": [
                    { "name": "id", "type": "Int", "is_index": true, "constraints": ["@id"],
                      "relation_ship_fields": [], "relation_ship_references": [] },
                    { "name": "title", "type": "String", "is_index": false, "constraints": [],
                      "relation_ship_fields": [], "relation_ship_references": [] },
                    { "name": "authorId", "type": "Int", "is_index": false, "constraints": [],
                      "relation_ship_fields": [], "relation_ship_references": [] },
                    { "name": "author", "type": "User", "is_index": false, "constraints": [],
                      "relation_ship_fields": ["authorId"], "relation_ship_references": ["id"] }
                ],
                "code": ""
            })
        })
        .collect();
    serde_json::from_value(json!({ "schema": "model A {}", "result": models })).unwrap()
}

fn schema_file() -> SchemaFile {
    SchemaFile::new("schema.prisma", "model User {id Int}")
}

fn offline() -> FetchError {
    FetchError::Status {
        url: "http://localhost/api/v1/visualise".into(),
        status: 503,
    }
}

fn expanded_count<S: SchemaService>(session: &Session<S>) -> usize {
    session
        .display()
        .render()
        .unwrap_or_default()
        .iter()
        .filter(|card| card.mode.is_expanded())
        .count()
}

mod rendering {
    use super::*;

    #[test]
    fn single_user_model_table_row() {
        let session = Session::new(FakeService::replying(vec![Ok(user_schema())]));
        session.upload(&schema_file());
        session.display().show_table("m1").unwrap();

        let cards = session.display().render().unwrap();
        assert_eq!(cards.len(), 1);
        match &cards[0].body {
            CardBody::Table { rows } => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].name, "id");
                assert_eq!(rows[0].field_type, "Int");
                assert!(rows[0].constraints.is_empty());
                assert!(rows[0].relation_fields.is_empty());
                assert!(rows[0].relation_references.is_empty());
                assert!(!rows[0].emphasized);
            }
            other => panic!("expected table, got {:?}", other),
        }

        let html = session.display().render_html();
        assert!(html.contains("<tr><td>id</td><td>Int</td><td></td><td></td><td></td><td>false</td></tr>"));
    }

    #[test]
    fn cards_follow_server_order() {
        let session = Session::new(FakeService::replying(vec![Ok(blog_schema(&["z", "a", "m"]))]));
        session.upload(&schema_file());

        let ids: Vec<String> = session
            .display()
            .render()
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, ["z", "a", "m"]);
    }

    #[test]
    fn new_upload_replaces_all_cards() {
        let session = Session::new(FakeService::replying(vec![
            Ok(blog_schema(&["a", "b", "c"])),
            Ok(blog_schema(&["x"])),
        ]));
        session.upload(&schema_file());
        session.display().show_table("b").unwrap();
        session.upload(&schema_file());

        let cards = session.display().render().unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, "x");
        assert_eq!(cards[0].mode, DisplayMode::Collapsed);
        assert_eq!(session.display().active_model_id(), None);
    }

    #[test]
    fn failed_upload_leaves_display_empty() {
        let session = Session::new(FakeService::replying(vec![Err(offline())]));
        session.upload(&schema_file());

        assert!(session.display().render().is_none());
        assert_eq!(session.display().render_html(), "");
        assert_eq!(
            session.cache().read(SCHEMA_CACHE_TAG).unwrap().status(),
            CacheStatus::Failure
        );
        assert_eq!(session.affordance(), UploadAffordance::DropZone);
    }

    #[test]
    fn failed_reupload_clears_previous_cards() {
        let session = Session::new(FakeService::replying(vec![
            Ok(blog_schema(&["a"])),
            Err(offline()),
        ]));
        session.upload(&schema_file());
        assert_eq!(session.affordance(), UploadAffordance::UploadAnother);

        session.upload(&schema_file());
        assert!(session.display().render().is_none());
    }

    #[test]
    fn active_card_is_wide() {
        let session = Session::new(FakeService::replying(vec![Ok(blog_schema(&["a", "b"]))]));
        session.upload(&schema_file());
        session.display().show_table("b").unwrap();

        let spans: Vec<u8> = session
            .display()
            .render()
            .unwrap()
            .iter()
            .map(|c| c.width.span())
            .collect();
        assert_eq!(spans, [2, 6]);
    }
}

mod mutual_exclusion {
    use super::*;

    #[test]
    fn table_on_a_collapses_code_on_b() {
        let session = Session::new(FakeService::replying(vec![Ok(blog_schema(&["a", "b"]))]));
        session.upload(&schema_file());

        session.display().show_code("b").unwrap();
        assert_eq!(session.display().mode_of("b"), DisplayMode::Code);

        session.display().show_table("a").unwrap();
        assert_eq!(session.display().mode_of("a"), DisplayMode::Table);
        assert_eq!(session.display().mode_of("b"), DisplayMode::Collapsed);
    }

    #[test]
    fn collapse_clears_active_only_for_own_card() {
        let session = Session::new(FakeService::replying(vec![Ok(blog_schema(&["a", "b"]))]));
        session.upload(&schema_file());

        session.display().show_table("a").unwrap();
        session.display().collapse("b").unwrap();
        assert_eq!(session.display().active_model_id().as_deref(), Some("a"));

        session.display().collapse("a").unwrap();
        assert_eq!(session.display().active_model_id(), None);
        assert_eq!(expanded_count(&session), 0);
    }

    proptest! {
        #[test]
        fn at_most_one_card_expanded(actions in prop::collection::vec((0usize..5, 0usize..3), 0..60)) {
            let ids = ["a", "b", "c", "d", "e"];
            let session = Session::new(FakeService::replying(vec![Ok(blog_schema(&ids))]));
            session.upload(&schema_file());

            for (card, control) in actions {
                let control = CardControl::ALL[control];
                session.display().apply(ids[card], control).unwrap();

                prop_assert!(expanded_count(&session) <= 1);
                if control == CardControl::Collapse {
                    prop_assert_eq!(session.display().mode_of(ids[card]), DisplayMode::Collapsed);
                } else {
                    prop_assert_eq!(session.display().mode_of(ids[card]), control.target());
                    let active = session.display().active_model_id();
                    prop_assert_eq!(active.as_deref(), Some(ids[card]));
                }
            }
        }
    }
}

mod code_view {
    use super::*;

    #[test]
    fn toggling_code_twice_fetches_once() {
        let session = Session::new(FakeService::replying(vec![Ok(user_schema())]));
        session.upload(&schema_file());

        session.display().show_code("m1").unwrap();
        session.display().show_code("m1").unwrap();
        session.display().show_table("m1").unwrap();
        session.display().show_code("m1").unwrap();

        assert_eq!(fetches(&session), 1);
    }

    #[test]
    fn highlight_is_sanitized() {
        let session = Session::new(FakeService::replying(vec![Ok(user_schema())]));
        session.upload(&schema_file());
        session.display().show_code("m1").unwrap();

        let cards = session.display().render().unwrap();
        assert_eq!(
            cards[0].body,
            CardBody::Code {
                html: Some(r#"<span class="model-name">0</span>"#.into())
            }
        );
        assert!(!session.display().render_html().contains("script"));
    }

    #[test]
    fn failed_fetch_stays_in_code_mode_empty() {
        let service = FakeService::replying(vec![Ok(user_schema())]);
        service.highlight_fails.set(true);
        let session = Session::new(service);
        session.upload(&schema_file());

        session.display().show_code("m1").unwrap();

        assert_eq!(session.display().mode_of("m1"), DisplayMode::Code);
        let cards = session.display().render().unwrap();
        assert_eq!(cards[0].body, CardBody::Code { html: None });
    }

    #[test]
    fn placeholder_until_highlight_arrives() {
        let session = Session::new(FakeService::replying(vec![Ok(user_schema())]));
        session.upload(&schema_file());

        let pending = session.display().begin_code("m1").unwrap().unwrap();
        assert_eq!(fetches(&session), 0);
        assert_eq!(session.display().mode_of("m1"), DisplayMode::Code);
        assert_eq!(
            session.display().render().unwrap()[0].body,
            CardBody::Code { html: None }
        );

        let reply = session.service().code_highlight(&pending.request());
        session.display().finish_code(pending, reply);
        assert_eq!(
            session.display().render().unwrap()[0].body,
            CardBody::Code {
                html: Some(r#"<span class="model-name">0</span>"#.into())
            }
        );
    }

    #[test]
    fn highlight_for_replaced_schema_is_dropped() {
        let session = Session::new(FakeService::replying(vec![
            Ok(user_schema()),
            Ok(user_schema()),
        ]));
        session.upload(&schema_file());
        let pending = session.display().begin_code("m1").unwrap().unwrap();

        session.upload(&schema_file());
        let reply = session.service().code_highlight(&pending.request());
        assert!(session.display().finish_code(pending, reply).is_none());

        assert!(session.display().highlight("m1").is_none());
        session.display().show_code("m1").unwrap();
        assert_eq!(fetches(&session), 2);
    }

    fn fetches(session: &Session<FakeService>) -> usize {
        session.service().highlight_calls.get()
    }
}
