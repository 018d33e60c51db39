//! Router tests against an in-memory store and a scripted caster.

use std::sync::{Arc, Mutex};

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use forma_core::{
  builtin,
  cast::{CastError, CastRequest, Caster},
  schema::{FieldSpec, FieldType, SchemaDefinition},
  store::SchemaStore,
};
use forma_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::api_router;

// ─── Fixtures ────────────────────────────────────────────────────────────────

/// Answers every cast with a fixed reply (or fails when there is none) and
/// remembers what it was asked.
#[derive(Default)]
struct StubCaster {
  reply: Option<Value>,
  seen:  Mutex<Vec<CastRequest>>,
}

impl StubCaster {
  fn replying(reply: Value) -> Self {
    Self {
      reply: Some(reply),
      ..Self::default()
    }
  }

  fn requests(&self) -> Vec<CastRequest> { self.seen.lock().unwrap().clone() }
}

impl Caster for StubCaster {
  async fn cast(&self, request: CastRequest) -> Result<Value, CastError> {
    self.seen.lock().unwrap().push(request);
    self
      .reply
      .clone()
      .ok_or_else(|| CastError::Unavailable("stub is offline".into()))
  }
}

/// Appends a competing version of `name` while the cast is in flight.
struct RacingCaster {
  store: Arc<SqliteStore>,
  rival: SchemaDefinition,
  reply: Value,
}

impl Caster for RacingCaster {
  async fn cast(&self, _request: CastRequest) -> Result<Value, CastError> {
    self.store.create(self.rival.clone()).await.unwrap();
    Ok(self.reply.clone())
  }
}

async fn seeded_store() -> Arc<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  store
    .ensure_builtins_seeded(&builtin::definitions())
    .await
    .unwrap();
  Arc::new(store)
}

async fn app(caster: StubCaster) -> (Router, Arc<SqliteStore>, Arc<StubCaster>) {
  let store = seeded_store().await;
  let caster = Arc::new(caster);
  (api_router(store.clone(), caster.clone()), store, caster)
}

fn movie(fields: &[&str]) -> Value {
  json!({
    "name": "Movie",
    "description": "A film",
    "prompt": "What did you watch?",
    "fields": fields
      .iter()
      .map(|f| json!({ "name": f, "type": "string", "description": f }))
      .collect::<Vec<_>>(),
  })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let json = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, json)
}

// ─── Schemas ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_shows_builtins_as_summaries() {
  let (app, ..) = app(StubCaster::default()).await;

  let (status, body) = send(&app, "GET", "/schemas", None).await;
  assert_eq!(status, StatusCode::OK);

  let new_schema = &body[builtin::NEW_SCHEMA];
  assert_eq!(new_schema["title"], builtin::NEW_SCHEMA);
  assert_eq!(new_schema["is_builtin"], true);
  assert_eq!(new_schema["properties"]["fields"]["type"], "list");
}

#[tokio::test]
async fn post_creates_then_appends_versions() {
  let (app, ..) = app(StubCaster::default()).await;

  let (status, v1) = send(&app, "POST", "/schemas", Some(movie(&["title"]))).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(v1["version"], 1);

  let (status, v2) = send(&app, "POST", "/schemas", Some(movie(&["title", "year"]))).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(v2["version"], 2);

  let (status, current) = send(&app, "GET", "/schemas/Movie", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(current["fields"].as_array().unwrap().len(), 2);
  assert_eq!(current["is_builtin"], false);

  let (status, versions) = send(&app, "GET", "/schemas/Movie/versions", None).await;
  assert_eq!(status, StatusCode::OK);
  let versions = versions.as_array().unwrap();
  assert_eq!(versions.len(), 2);
  assert_eq!(versions[0]["version"], 2);
  assert_eq!(versions[0]["parent_version_id"], versions[1]["id"]);
  assert_eq!(versions[1]["parent_version_id"], Value::Null);
}

#[tokio::test]
async fn post_with_stale_base_version_is_a_conflict() {
  let (app, store, _) = app(StubCaster::default()).await;
  send(&app, "POST", "/schemas", Some(movie(&["title"]))).await;
  send(&app, "POST", "/schemas", Some(movie(&["title", "year"]))).await;

  let mut stale = movie(&["director"]);
  stale["base_version"] = json!(1);
  let (status, body) = send(&app, "POST", "/schemas", Some(stale)).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["type"], "conflict");
  assert_eq!(store.list_versions("Movie").await.unwrap().len(), 2);

  let mut fresh = movie(&["director"]);
  fresh["base_version"] = json!(2);
  let (status, v3) = send(&app, "POST", "/schemas", Some(fresh)).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(v3["version"], 3);
  assert_eq!(v3["fields"][0]["name"], "director");
}

#[tokio::test]
async fn post_unlisted_field_type_is_stored_as_given() {
  let (app, store, _) = app(StubCaster::default()).await;
  let mut body = movie(&["title"]);
  body["fields"][0]["type"] = json!("datetime");

  let (status, created) = send(&app, "POST", "/schemas", Some(body)).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(created["fields"][0]["type"], "datetime");

  let current = store.current_version("Movie").await.unwrap().unwrap();
  assert_eq!(current.fields[0].field_type, FieldType::Other("datetime".into()));
}

#[tokio::test]
async fn post_cannot_mark_a_schema_builtin() {
  let (app, ..) = app(StubCaster::default()).await;
  let mut body = movie(&["title"]);
  body["is_builtin"] = json!(true);

  send(&app, "POST", "/schemas", Some(body)).await;
  let (status, _) = send(&app, "DELETE", "/schemas/Movie", None).await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_definition_is_a_validation_error() {
  let (app, ..) = app(StubCaster::default()).await;

  let (status, body) = send(&app, "POST", "/schemas", Some(json!({ "name": "Movie" }))).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["type"], "validation_error");

  let mut unnamed = movie(&[]);
  unnamed["name"] = json!("  ");
  let (status, body) = send(&app, "POST", "/schemas", Some(unnamed)).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["type"], "validation_error");
}

#[tokio::test]
async fn missing_schema_is_not_found() {
  let (app, ..) = app(StubCaster::default()).await;

  for uri in ["/schemas/Nope", "/schemas/Nope/versions", "/generations/Nope"] {
    let (status, body) = send(&app, "GET", uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    assert_eq!(body["type"], "not_found", "{uri}");
  }
}

#[tokio::test]
async fn delete_rules() {
  let (app, ..) = app(StubCaster::default()).await;
  send(&app, "POST", "/schemas", Some(movie(&["title"]))).await;

  let (status, body) = send(&app, "DELETE", "/schemas/NewSchema", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["type"], "schema_error");

  let (status, body) = send(&app, "DELETE", "/schemas/Movie", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["message"], "Schema Movie deleted successfully");

  let (status, _) = send(&app, "GET", "/schemas/Movie", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = send(&app, "DELETE", "/schemas/Movie", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Rewrite ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rewrite_appends_a_version_and_keeps_the_name() {
  let mut reply = movie(&["title", "year"]);
  reply["name"] = json!("Film");
  let (app, _, caster) = app(StubCaster::replying(reply)).await;
  send(&app, "POST", "/schemas", Some(movie(&["title"]))).await;

  let (status, body) = send(
    &app,
    "PUT",
    "/schemas/Movie",
    Some(json!({ "prompt": "add the release year" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["name"], "Movie");
  assert_eq!(body["fields"].as_array().unwrap().len(), 2);

  let (_, versions) = send(&app, "GET", "/schemas/Movie/versions", None).await;
  assert_eq!(versions.as_array().unwrap().len(), 2);
  let (status, _) = send(&app, "GET", "/schemas/Film", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let requests = caster.requests();
  assert_eq!(requests.len(), 1);
  assert_eq!(requests[0].target.name, builtin::NEW_SCHEMA);
  assert!(requests[0].text.contains("What did you watch?"));
  let instructions = requests[0].instructions.as_deref().unwrap();
  assert!(instructions.starts_with("add the release year"));
  assert!(instructions.contains("keep the name as 'Movie'"));
}

#[tokio::test]
async fn rewrite_of_missing_schema_never_casts() {
  let (app, _, caster) = app(StubCaster::replying(movie(&["title"]))).await;

  let (status, _) = send(&app, "PUT", "/schemas/Movie", Some(json!({ "prompt": "x" }))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(caster.requests().is_empty());
}

#[tokio::test]
async fn rewrite_losing_a_race_is_a_conflict() {
  let store = seeded_store().await;
  let movie_def = |fields: &[&str]| SchemaDefinition {
    name:        "Movie".into(),
    description: "A film".into(),
    prompt:      "What did you watch?".into(),
    fields:      fields
      .iter()
      .map(|f| FieldSpec::new(*f, FieldType::String, *f))
      .collect(),
    is_builtin:  false,
  };
  store.create(movie_def(&["title"])).await.unwrap();

  let caster = Arc::new(RacingCaster {
    store: store.clone(),
    rival: movie_def(&["title", "rival"]),
    reply: movie(&["title", "mine"]),
  });
  let app = api_router(store.clone(), caster);

  let (status, body) = send(&app, "PUT", "/schemas/Movie", Some(json!({ "prompt": "x" }))).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["type"], "conflict");

  // Only the rival's version landed.
  let versions = store.list_versions("Movie").await.unwrap();
  assert_eq!(versions.len(), 2);
  assert_eq!(versions[0].fields[1].name, "rival");
}

#[tokio::test]
async fn rewrite_with_unusable_output_is_a_schema_error() {
  let (app, ..) = app(StubCaster::replying(json!({ "title": "not a schema" }))).await;
  send(&app, "POST", "/schemas", Some(movie(&["title"]))).await;

  let (status, body) = send(&app, "PUT", "/schemas/Movie", Some(json!({ "prompt": "x" }))).await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body["type"], "schema_error");

  let (_, versions) = send(&app, "GET", "/schemas/Movie/versions", None).await;
  assert_eq!(versions.as_array().unwrap().len(), 1);
}

// ─── Generate ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn generate_records_against_the_resolved_version() {
  let (app, _, caster) = app(StubCaster::replying(json!({ "title": "Alien" }))).await;
  send(&app, "POST", "/schemas", Some(movie(&["title"]))).await;

  let (status, body) = send(
    &app,
    "POST",
    "/generate/Movie",
    Some(json!({ "prompt": "that one with the xenomorph" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "title": "Alien" }));

  let requests = caster.requests();
  assert_eq!(requests[0].text, "that one with the xenomorph");
  assert_eq!(requests[0].target.name, "Movie");
  assert!(requests[0].instructions.is_none());

  // A later version does not move the recorded generation.
  send(&app, "POST", "/schemas", Some(movie(&["title", "year"]))).await;

  let (status, history) = send(&app, "GET", "/generations/Movie", None).await;
  assert_eq!(status, StatusCode::OK);
  let history = history.as_array().unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0]["schema_version"], 1);
  assert_eq!(history[0]["prompt"], "that one with the xenomorph");
  assert_eq!(history[0]["output"]["title"], "Alien");
  assert_eq!(history[0]["is_favorite"], false);
}

#[tokio::test]
async fn generate_for_missing_schema_never_casts() {
  let (app, _, caster) = app(StubCaster::replying(json!({}))).await;

  let (status, body) = send(&app, "POST", "/generate/Nope", Some(json!({ "prompt": "x" }))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["type"], "not_found");
  assert!(caster.requests().is_empty());
}

#[tokio::test]
async fn failed_cast_is_a_generation_error_and_records_nothing() {
  let (app, store, _) = app(StubCaster::default()).await;
  send(&app, "POST", "/schemas", Some(movie(&["title"]))).await;

  let (status, body) = send(&app, "POST", "/generate/Movie", Some(json!({ "prompt": "x" }))).await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body["type"], "generation_error");
  assert!(store.list_for_schema("Movie", false).await.unwrap().is_empty());
}

#[tokio::test]
async fn generating_a_new_schema_creates_it() {
  let reply = json!({
    "name": "Recipe",
    "description": "A dish and how to make it",
    "prompt": "What are you cooking?",
    "fields": [
      { "name": "title", "type": "string", "description": "Dish name" },
      { "name": "servings", "type": "integer", "description": "How many" },
    ],
    "is_builtin": true,
  });
  let (app, store, caster) = app(StubCaster::replying(reply)).await;

  let (status, body) = send(
    &app,
    "POST",
    "/generate/NewSchema",
    Some(json!({ "prompt": "something for recipes" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["name"], "Recipe");
  assert_eq!(body["is_builtin"], false);

  let recipe = store.current_version("Recipe").await.unwrap().unwrap();
  assert_eq!(recipe.version, 1);
  assert!(!recipe.is_builtin);
  assert_eq!(recipe.fields[1].field_type, FieldType::Integer);

  let requests = caster.requests();
  assert_eq!(
    requests[0].instructions.as_deref(),
    Some(builtin::NEW_SCHEMA_INSTRUCTIONS)
  );

  let history = store.list_for_schema(builtin::NEW_SCHEMA, false).await.unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].output["name"], "Recipe");
}

#[tokio::test]
async fn unusable_new_schema_output_creates_nothing() {
  let (app, store, _) = app(StubCaster::replying(json!({ "nonsense": 1 }))).await;

  let (status, body) = send(&app, "POST", "/generate/NewSchema", Some(json!({ "prompt": "x" }))).await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body["type"], "schema_error");
  assert_eq!(store.get_all().await.unwrap().len(), builtin::definitions().len());
}

#[tokio::test]
async fn new_schema_with_blank_name_creates_nothing() {
  let reply = json!({
    "name": "  ",
    "description": "Nameless",
    "prompt": "?",
    "fields": [],
  });
  let (app, store, _) = app(StubCaster::replying(reply)).await;

  let (status, body) = send(&app, "POST", "/generate/NewSchema", Some(json!({ "prompt": "x" }))).await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body["type"], "schema_error");
  assert_eq!(store.get_all().await.unwrap().len(), builtin::definitions().len());
  assert!(store.current_version("  ").await.unwrap().is_none());
}

#[tokio::test]
async fn new_schema_with_unlisted_field_type_is_created() {
  let reply = json!({
    "name": "Event",
    "description": "Something that happens at a time",
    "prompt": "What is on?",
    "fields": [
      { "name": "when", "type": "datetime", "description": "Start time" },
      { "name": "title", "type": "string", "description": "What it is" },
    ],
  });
  let (app, store, _) = app(StubCaster::replying(reply)).await;

  let (status, body) = send(&app, "POST", "/generate/NewSchema", Some(json!({ "prompt": "events" }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["fields"][0]["type"], "datetime");

  let event = store.current_version("Event").await.unwrap().unwrap();
  assert_eq!(event.fields[0].field_type, FieldType::Other("datetime".into()));
  assert_eq!(event.fields[1].field_type, FieldType::String);

  let (status, summaries) = send(&app, "GET", "/schemas", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(summaries["Event"]["properties"]["when"]["type"], "datetime");
}

// ─── Generations ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn favourites_toggle_and_filter() {
  let (app, ..) = app(StubCaster::replying(json!({ "title": "Heat" }))).await;
  send(&app, "POST", "/schemas", Some(movie(&["title"]))).await;
  send(&app, "POST", "/generate/Movie", Some(json!({ "prompt": "a" }))).await;
  send(&app, "POST", "/generate/Movie", Some(json!({ "prompt": "b" }))).await;

  let (_, history) = send(&app, "GET", "/generations/Movie", None).await;
  let newest = history[0]["id"].as_i64().unwrap();
  assert_eq!(history[0]["prompt"], "b");

  let (status, toggled) = send(&app, "PUT", &format!("/generations/{newest}/favorite"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(toggled["is_favorite"], true);

  let (_, favourites) = send(&app, "GET", "/generations/Movie?favorites_only=true", None).await;
  let favourites = favourites.as_array().unwrap();
  assert_eq!(favourites.len(), 1);
  assert_eq!(favourites[0]["id"], newest);

  let (status, _) = send(&app, "PUT", "/generations/9999/favorite", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_generation_then_again_is_not_found() {
  let (app, ..) = app(StubCaster::replying(json!({ "title": "Ran" }))).await;
  send(&app, "POST", "/schemas", Some(movie(&["title"]))).await;
  send(&app, "POST", "/generate/Movie", Some(json!({ "prompt": "a" }))).await;

  let (_, history) = send(&app, "GET", "/generations/Movie", None).await;
  let id = history[0]["id"].as_i64().unwrap();

  let (status, _) = send(&app, "DELETE", &format!("/generations/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  let (status, body) = send(&app, "DELETE", &format!("/generations/{id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["type"], "not_found");
}

#[tokio::test]
async fn non_numeric_generation_id_is_a_validation_error() {
  let (app, ..) = app(StubCaster::default()).await;

  let (status, body) = send(&app, "DELETE", "/generations/abc", None).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["type"], "validation_error");
  assert!(body["message"].is_string());

  let (status, body) = send(&app, "PUT", "/generations/abc/favorite", None).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["type"], "validation_error");
}

#[tokio::test]
async fn all_generations_are_grouped_by_schema() {
  let (app, ..) = app(StubCaster::replying(json!({ "title": "x" }))).await;
  send(&app, "POST", "/schemas", Some(movie(&["title"]))).await;
  let mut book = movie(&["title"]);
  book["name"] = json!("Book");
  send(&app, "POST", "/schemas", Some(book)).await;

  send(&app, "POST", "/generate/Movie", Some(json!({ "prompt": "m1" }))).await;
  send(&app, "POST", "/generate/Book", Some(json!({ "prompt": "b1" }))).await;
  send(&app, "POST", "/generate/Movie", Some(json!({ "prompt": "m2" }))).await;

  let (status, grouped) = send(&app, "GET", "/generations", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(grouped["Book"].as_array().unwrap().len(), 1);
  let movies = grouped["Movie"].as_array().unwrap();
  assert_eq!(movies.len(), 2);
  assert_eq!(movies[0]["prompt"], "m2");
}
