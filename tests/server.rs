use std::sync::{Arc, RwLock, Weak};

use actix_web::http::StatusCode;
use actix_web::{test, web};
use serde_json::json;
use uuid::Uuid;
use webthing::{
    build_app, Action, ActionGenerator, AppState, BaseAction, BaseProperty, BaseThing, Thing,
    ThingsType, Value,
};

struct Generator;

impl ActionGenerator for Generator {
    fn generate(
        &self,
        thing: Weak<RwLock<Box<dyn Thing>>>,
        name: String,
        input: Option<&serde_json::Value>,
    ) -> Option<Box<dyn Action>> {
        match name.as_str() {
            "fade" => Some(Box::new(BaseAction::new(
                Uuid::new_v4().to_string(),
                name,
                input.and_then(|i| i.as_object().cloned()),
                thing,
            ))),
            _ => None,
        }
    }
}

fn metadata(value: serde_json::Value) -> Option<serde_json::Map<String, serde_json::Value>> {
    value.as_object().cloned()
}

fn lamp() -> Arc<RwLock<Box<dyn Thing>>> {
    let mut thing = BaseThing::new(
        "urn:dev:ops:my-lamp-1234".to_owned(),
        "My Lamp".to_owned(),
        Some(vec!["OnOffSwitch".to_owned(), "Light".to_owned()]),
        Some("A web connected lamp".to_owned()),
    );

    thing.add_property(Box::new(BaseProperty::new(
        "on".to_owned(),
        Value::with_forwarder(json!(false), |_| Ok(())),
        metadata(json!({"title": "On/Off", "type": "boolean"})),
    )));
    thing.add_property(Box::new(BaseProperty::new(
        "brightness".to_owned(),
        Value::with_forwarder(json!(50), |_| Ok(())),
        metadata(json!({"type": "integer", "minimum": 0, "maximum": 100})),
    )));
    thing.add_property(Box::new(BaseProperty::new(
        "temperature".to_owned(),
        Value::with_forwarder(json!(21.5), |_| Ok(())),
        metadata(json!({"type": "number", "readOnly": true})),
    )));
    thing.add_available_action(
        "fade".to_owned(),
        metadata(json!({
            "title": "Fade",
            "input": {
                "type": "object",
                "required": ["brightness", "duration"],
                "properties": {
                    "brightness": {"type": "integer", "minimum": 0, "maximum": 100},
                    "duration": {"type": "integer", "minimum": 1}
                }
            }
        }))
        .unwrap_or_default(),
    );

    Arc::new(RwLock::new(Box::new(thing)))
}

fn sensor() -> Arc<RwLock<Box<dyn Thing>>> {
    let mut thing = BaseThing::new(
        "urn:dev:ops:my-humidity-sensor-1234".to_owned(),
        "My Humidity Sensor".to_owned(),
        Some(vec!["MultiLevelSensor".to_owned()]),
        None,
    );
    thing.add_property(Box::new(BaseProperty::new(
        "level".to_owned(),
        Value::read_only(json!(42)),
        metadata(json!({"type": "number"})),
    )));

    Arc::new(RwLock::new(Box::new(thing)))
}

fn state(things: ThingsType, base_path: &str) -> web::Data<AppState> {
    web::Data::new(AppState::new(
        things,
        Arc::new(Generator),
        base_path,
        Some(vec!["localhost".to_owned(), "localhost:8888".to_owned()]),
    ))
}

fn get(uri: &str) -> test::TestRequest {
    test::TestRequest::get()
        .uri(uri)
        .insert_header(("Host", "localhost:8888"))
}

fn put(uri: &str, body: serde_json::Value) -> test::TestRequest {
    test::TestRequest::put()
        .uri(uri)
        .insert_header(("Host", "localhost:8888"))
        .set_json(body)
}

fn post(uri: &str, body: serde_json::Value) -> test::TestRequest {
    test::TestRequest::post()
        .uri(uri)
        .insert_header(("Host", "localhost:8888"))
        .set_json(body)
}

#[actix_rt::test]
async fn thing_description_describes_lamp() {
    let app = test::init_service(build_app(state(ThingsType::Single(lamp()), ""))).await;

    let resp = test::call_service(&app, get("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("Access-Control-Allow-Origin").unwrap(),
        "*"
    );

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["id"], json!("urn:dev:ops:my-lamp-1234"));
    assert_eq!(body["title"], json!("My Lamp"));
    assert_eq!(body["@type"], json!(["OnOffSwitch", "Light"]));
    assert_eq!(body["properties"]["on"]["type"], json!("boolean"));
    assert_eq!(body["properties"]["brightness"]["maximum"], json!(100));
    assert_eq!(
        body["properties"]["brightness"]["links"][0]["href"],
        json!("/properties/brightness")
    );
    assert_eq!(body["actions"]["fade"]["links"][0]["href"], json!("/actions/fade"));
    assert_eq!(body["base"], json!("http://localhost:8888/"));
    assert_eq!(body["security"], json!("nosec_sc"));
    assert_eq!(
        body["securityDefinitions"],
        json!({"nosec_sc": {"scheme": "nosec"}})
    );

    let links = body["links"].as_array().unwrap();
    assert!(links.contains(&json!({"rel": "alternate", "href": "ws://localhost:8888/"})));
}

#[actix_rt::test]
async fn property_writes_are_validated() {
    let app = test::init_service(build_app(state(ThingsType::Single(lamp()), ""))).await;

    let resp = test::call_service(
        &app,
        put("/properties/brightness", json!({"brightness": 150})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());

    let body: serde_json::Value =
        test::call_and_read_body_json(&app, get("/properties/brightness").to_request()).await;
    assert_eq!(body, json!({"brightness": 50}));

    let resp = test::call_service(
        &app,
        put("/properties/brightness", json!({"brightness": 75})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"brightness": 75}));
}

#[actix_rt::test]
async fn property_round_trip() {
    let app = test::init_service(build_app(state(ThingsType::Single(lamp()), ""))).await;

    let resp =
        test::call_service(&app, put("/properties/on", json!({"on": true})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value =
        test::call_and_read_body_json(&app, get("/properties/on").to_request()).await;
    assert_eq!(body, json!({"on": true}));

    let body: serde_json::Value =
        test::call_and_read_body_json(&app, get("/properties").to_request()).await;
    assert_eq!(
        body,
        json!({"on": true, "brightness": 50, "temperature": 21.5})
    );
}

#[actix_rt::test]
async fn bad_property_requests() {
    let app = test::init_service(build_app(state(ThingsType::Single(lamp()), ""))).await;

    let resp =
        test::call_service(&app, put("/properties/on", json!({"off": true})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(
        &app,
        test::TestRequest::put()
            .uri("/properties/on")
            .insert_header(("Host", "localhost:8888"))
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{\"on\": tru")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(&app, get("/properties/color").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = test::call_service(
        &app,
        put("/properties/color", json!({"color": "red"})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = test::call_service(
        &app,
        put("/properties/temperature", json!({"temperature": 30})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = test::call_service(&app, get("/nothing/here").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn methods_outside_the_route_table() {
    let app = test::init_service(build_app(state(ThingsType::Single(lamp()), ""))).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri("/properties")
            .insert_header(("Host", "localhost:8888"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

    let resp = test::call_service(
        &app,
        test::TestRequest::default()
            .method(actix_web::http::Method::OPTIONS)
            .uri("/properties/on")
            .insert_header(("Host", "localhost:8888"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[actix_rt::test]
async fn foreign_host_is_rejected() {
    let app = test::init_service(build_app(state(ThingsType::Single(lamp()), ""))).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/")
            .insert_header(("Host", "evil.example.com"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/")
            .insert_header(("Host", "LOCALHOST"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn missing_host_is_rejected() {
    let app = test::init_service(build_app(state(ThingsType::Single(lamp()), ""))).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("http://localhost:8888/")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn host_validation_can_be_disabled() {
    let state = web::Data::new(AppState::new(
        ThingsType::Single(lamp()),
        Arc::new(Generator),
        "",
        None,
    ));
    let app = test::init_service(build_app(state)).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/")
            .insert_header(("Host", "evil.example.com"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn multiple_things_are_indexed() {
    let things = ThingsType::Multiple(vec![lamp(), sensor()], "LightAndTempDevice".to_owned());
    let app = test::init_service(build_app(state(things, ""))).await;

    let body: serde_json::Value = test::call_and_read_body_json(&app, get("/").to_request()).await;
    let listing = body.as_array().unwrap();
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0]["href"], json!("/0"));
    assert_eq!(listing[1]["href"], json!("/1"));
    assert_eq!(listing[1]["base"], json!("http://localhost:8888/1"));
    assert_eq!(
        listing[1]["properties"]["level"]["links"][0]["href"],
        json!("/1/properties/level")
    );

    let body: serde_json::Value =
        test::call_and_read_body_json(&app, get("/1/properties/level").to_request()).await;
    assert_eq!(body, json!({"level": 42}));

    let resp = test::call_service(
        &app,
        put("/1/properties/level", json!({"level": 10})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    for uri in ["/2", "/2/properties", "/-1/properties", "/abc/properties"] {
        let resp = test::call_service(&app, get(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[actix_rt::test]
async fn routes_live_under_base_path() {
    let app = test::init_service(build_app(state(ThingsType::Single(lamp()), "/things"))).await;

    let body: serde_json::Value =
        test::call_and_read_body_json(&app, get("/things").to_request()).await;
    assert_eq!(body["base"], json!("http://localhost:8888/things"));
    assert_eq!(
        body["properties"]["on"]["links"][0]["href"],
        json!("/things/properties/on")
    );

    let resp = test::call_service(&app, get("/things/properties").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, get("/properties").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn action_requests_lifecycle() {
    let app = test::init_service(build_app(state(ThingsType::Single(lamp()), ""))).await;

    let resp = test::call_service(
        &app,
        post(
            "/actions",
            json!({"fade": {"input": {"brightness": 20, "duration": 5}}}),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["fade"]["status"], json!("created"));
    assert_eq!(body["fade"]["input"], json!({"brightness": 20, "duration": 5}));
    let href = body["fade"]["href"].as_str().unwrap().to_owned();
    assert!(href.starts_with("/actions/fade/"));

    let body: serde_json::Value = test::call_and_read_body_json(&app, get(&href).to_request()).await;
    assert_eq!(body["fade"]["status"], json!("pending"));

    let body: serde_json::Value =
        test::call_and_read_body_json(&app, get("/actions/fade").to_request()).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let resp = test::call_service(&app, put(&href, json!({})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri(&href)
            .insert_header(("Host", "localhost:8888"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri(&href)
            .insert_header(("Host", "localhost:8888"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: serde_json::Value =
        test::call_and_read_body_json(&app, get("/actions").to_request()).await;
    assert_eq!(body, json!([]));
}

#[actix_rt::test]
async fn bad_action_requests() {
    let app = test::init_service(build_app(state(ThingsType::Single(lamp()), ""))).await;

    let resp = test::call_service(
        &app,
        post("/actions", json!({"fade": {"input": {"brightness": 20}}})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(
        &app,
        post("/actions/explode", json!({"explode": {}})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(
        &app,
        post("/actions", json!({"fade": {}, "explode": {}})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(&app, get("/actions/fade/unknown").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: serde_json::Value =
        test::call_and_read_body_json(&app, get("/events").to_request()).await;
    assert_eq!(body, json!([]));
}
