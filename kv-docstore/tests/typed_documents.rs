use kv_docstore::{DB, Error, KvDocument, Query};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(KvDocument, Serialize, Deserialize, Debug, Clone, PartialEq)]
struct Comment {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    nick: String,
    url: String,
    #[serde(default)]
    top: bool,
}

#[derive(KvDocument, Serialize, Deserialize, Debug, PartialEq)]
#[kv(collection = "guestbook")]
struct Entry {
    #[serde(rename = "_id")]
    id: String,
    text: String,
}

#[derive(KvDocument, Serialize, Deserialize, Debug, PartialEq)]
struct PageView {
    #[serde(rename = "_id")]
    id: String,
}

fn comment(nick: &str, url: &str) -> Comment {
    Comment {
        id: None,
        nick: nick.to_string(),
        url: url.to_string(),
        top: false,
    }
}

#[test]
fn collection_names() {
    assert_eq!(Comment::collection(), "comment");
    assert_eq!(Entry::collection(), "guestbook");
    assert_eq!(PageView::collection(), "page_view");
}

#[tokio::test]
async fn typed_round_trip() {
    let _ = env_logger::builder().is_test(true).try_init();
    let db = DB::in_memory();
    let comments = db.typed::<Comment>();

    let inserted = comments.add(&comment("alice", "/a")).await.unwrap();
    let stored = comments.get(&inserted.id).await.unwrap().unwrap();
    assert_eq!(stored.id.as_deref(), Some(inserted.id.as_str()));
    assert_eq!(stored.nick, "alice");

    assert!(db.backend().snapshot().unwrap().contains_key(&format!("comment:{}", inserted.id)));
}

#[tokio::test]
async fn typed_query_update_delete() {
    let db = DB::in_memory();
    let comments = db.typed::<Comment>();
    comments
        .bulk_add(&[comment("a", "/x"), comment("b", "/y"), comment("c", "/x")])
        .await
        .unwrap();

    let on_x = comments
        .all(&Query::parse(&json!({"url": "/x"})).unwrap())
        .await
        .unwrap();
    assert_eq!(
        on_x.iter().map(|c| c.nick.as_str()).collect::<Vec<_>>(),
        vec!["a", "c"]
    );

    let id = on_x[0].id.clone().unwrap();
    comments.update(&id, json!({"top": true})).await.unwrap();
    let pinned = comments
        .all(&Query::parse(&json!({"top": true})).unwrap())
        .await
        .unwrap();
    assert_eq!(pinned.len(), 1);
    assert_eq!(pinned[0].nick, "a");

    comments.delete(&id).await.unwrap();
    assert!(comments.get(&id).await.unwrap().is_none());
    assert_eq!(comments.untyped().ids().await.unwrap().len(), 2);
}

#[tokio::test]
async fn explicit_collection_and_id() {
    let db = DB::in_memory();
    let entries = db.typed::<Entry>();
    let inserted = entries
        .add(&Entry {
            id: "e1".to_string(),
            text: "hi".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(inserted.id, "e1");
    assert_eq!(db.index().list("guestbook").await.unwrap(), vec!["e1"]);
}

#[tokio::test]
async fn shape_mismatch_is_a_deserialization_error() {
    let db = DB::in_memory();
    db.collection("guestbook")
        .add_one(kv_docstore::into_document(json!({"_id": "e1", "text": 5})).unwrap())
        .await
        .unwrap();
    assert!(matches!(
        db.typed::<Entry>().get("e1").await,
        Err(Error::DeserializationError(_))
    ));
}
