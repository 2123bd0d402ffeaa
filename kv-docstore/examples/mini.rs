use kv_docstore::{DB, Dispatcher, Error, KvDocument, Query, Request, StoreOptions};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(KvDocument, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Comment {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub nick: String,
    pub url: String,
    pub comment: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();

    // KV_DOCSTORE_PD_ENDPOINTS=127.0.0.1:2379 cargo run --example mini
    let options = StoreOptions::from_env()?;
    let db = DB::connect(&options).await?;

    let comments = db.typed::<Comment>();
    let inserted = comments
        .add(&Comment {
            id: None,
            nick: "Alice".to_string(),
            url: "/posts/hello".to_string(),
            comment: "first!".to_string(),
        })
        .await?;
    println!("{:?}", inserted);

    let query = Query::parse(&json!({
        "url": "/posts/hello",
        "nick": {"$regex": "^al", "$options": "i"}
    }))?;
    let on_page = comments.all(&query).await?;
    println!("{:?}", on_page);

    db.counters()
        .increment("/posts/hello", Some("Hello".to_string()))
        .await?;
    println!("{:?}", db.counters().get("/posts/hello").await?);

    let dispatcher = Dispatcher::with_collection(db.clone(), options.collection.clone());
    let response = dispatcher
        .dispatch(Request::new("getComment", json!({ "id": inserted.id })))
        .await;
    println!("{}", serde_json::to_string(&response).unwrap_or_default());

    comments.delete(&inserted.id).await?;

    Ok(())
}
