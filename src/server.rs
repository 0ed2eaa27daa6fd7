/// Rust Web Thing server implementation.
use std::future::{ready, Ready};
use std::sync::{Arc, RwLock};

use actix::prelude::*;
use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{Server, Service, ServiceFactory, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::{header, StatusCode};
use actix_web::{middleware, web, App, HttpRequest, HttpResponse, HttpServer, ResponseError};
use actix_web_actors::ws;
use futures::future::LocalBoxFuture;
use futures::StreamExt;
use log::{debug, info, warn};
use serde_json::json;
use uuid::Uuid;

#[cfg(feature = "ssl")]
use openssl::ssl::{SslAcceptor, SslFiletype, SslMethod};

use crate::action::ActionGenerator;
use crate::container::{ThingLookup, ThingsType};
use crate::error::{Error, Result};
use crate::router::{Params, Router};
use crate::subscriber::Subscriber;
use crate::thing::Thing;
use crate::utils::{get_addresses, read_lock, write_lock};

const MAX_BODY_SIZE: usize = 262_144;

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::ReadOnlyProperty | Error::ReadOnlyValue => StatusCode::FORBIDDEN,
            Error::ThingNotFound | Error::PropertyNotFound(_) | Error::ActionRequestNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Error::Delivery(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::InvalidValue(_)
            | Error::Forward(_)
            | Error::ActionNotFound(_)
            | Error::InvalidActionInput
            | Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({"error": self.to_string()}))
    }
}

/// Shared app state, used by server threads.
pub struct AppState {
    things: ThingsType,
    router: Router<Box<dyn RouteHandler>>,
    hosts: Option<Vec<String>>,
    action_generator: Arc<dyn ActionGenerator>,
}

impl AppState {
    /// Create the state for a set of things and mount their routes.
    ///
    /// things -- things managed by the server
    /// action_generator -- generator for requested actions
    /// base_path -- path prefix all routes are mounted under
    /// hosts -- allowed Host header values, None to accept any host
    pub fn new(
        things: ThingsType,
        action_generator: Arc<dyn ActionGenerator>,
        base_path: &str,
        hosts: Option<Vec<String>>,
    ) -> AppState {
        let mut router: Router<Box<dyn RouteHandler>> = Router::new(base_path);
        let base_path = router.base_path();

        let prefix = match &things {
            ThingsType::Multiple(list, _) => {
                for (idx, thing) in list.iter().enumerate() {
                    write_lock(thing).set_href_prefix(format!("{}/{}", base_path, idx));
                }
                router.add("/", Box::new(ThingsHandler));
                "/:thing_id"
            }
            ThingsType::Single(thing) => {
                write_lock(thing).set_href_prefix(base_path);
                ""
            }
        };

        router
            .add(&format!("{}/", prefix), Box::new(ThingHandler))
            .add(&format!("{}/properties", prefix), Box::new(PropertiesHandler))
            .add(
                &format!("{}/properties/:property_name", prefix),
                Box::new(PropertyHandler),
            )
            .add(&format!("{}/actions", prefix), Box::new(ActionsHandler))
            .add(
                &format!("{}/actions/:action_name", prefix),
                Box::new(ActionHandler),
            )
            .add(
                &format!("{}/actions/:action_name/:action_id", prefix),
                Box::new(ActionIdHandler),
            )
            .add(&format!("{}/events", prefix), Box::new(EventsHandler))
            .add(
                &format!("{}/events/:event_name", prefix),
                Box::new(EventHandler),
            );

        AppState {
            things,
            router,
            hosts: hosts.map(|h| h.iter().map(|h| h.to_lowercase()).collect()),
            action_generator,
        }
    }

    /// Check a Host header against the allow-list.
    ///
    /// A request without a host only passes when validation is disabled.
    fn validate_host(&self, host: Option<&str>) -> bool {
        match (&self.hosts, host) {
            (None, _) => true,
            (Some(hosts), Some(host)) => hosts.iter().any(|h| h.eq_ignore_ascii_case(host)),
            (Some(_), None) => false,
        }
    }
}

/// One routed request: the matched path parameters and the parsed body.
pub struct RouteContext<'a> {
    req: &'a HttpRequest,
    state: &'a AppState,
    params: Params,
    body: Option<serde_json::Value>,
}

impl<'a> RouteContext<'a> {
    /// Get the thing this request is for.
    fn thing(&self) -> Result<Arc<RwLock<Box<dyn Thing>>>> {
        self.state
            .things
            .get_thing(self.params.get("thing_id"))
            .ok_or(Error::ThingNotFound)
    }

    fn param(&self, name: &str) -> Result<&str> {
        self.params
            .get(name)
            .ok_or_else(|| Error::BadRequest(format!("Missing path segment: {}", name)))
    }

    fn body(&self) -> Result<&serde_json::Map<String, serde_json::Value>> {
        self.body
            .as_ref()
            .and_then(|b| b.as_object())
            .ok_or_else(|| Error::BadRequest("Request body must be a JSON object".to_owned()))
    }

    /// Describe a thing as seen from this request's scheme and host.
    fn describe(&self, thing: &dyn Thing) -> serde_json::Map<String, serde_json::Value> {
        let info = self.req.connection_info();
        let scheme = info.scheme();
        let ws_scheme = if scheme == "https" { "wss" } else { "ws" };
        let href = thing.get_href();

        let mut description = thing.as_thing_description();
        if let Some(serde_json::Value::Array(links)) = description.get_mut("links") {
            links.push(json!({
                "rel": "alternate",
                "href": format!("{}://{}{}", ws_scheme, info.host(), href),
            }));
        }

        description.insert(
            "base".to_owned(),
            json!(format!("{}://{}{}", scheme, info.host(), href)),
        );
        description.insert(
            "securityDefinitions".to_owned(),
            json!({"nosec_sc": {"scheme": "nosec"}}),
        );
        description.insert("security".to_owned(), json!("nosec_sc"));
        description
    }
}

/// A resource on the thing API. Unsupported methods answer 405.
pub trait RouteHandler: Send + Sync {
    /// Handle a GET request.
    fn get(&self, _ctx: &RouteContext) -> Result<HttpResponse> {
        Err(Error::MethodNotAllowed)
    }

    /// Handle a PUT request.
    fn put(&self, _ctx: &RouteContext) -> Result<HttpResponse> {
        Err(Error::MethodNotAllowed)
    }

    /// Handle a POST request.
    fn post(&self, _ctx: &RouteContext) -> Result<HttpResponse> {
        Err(Error::MethodNotAllowed)
    }

    /// Handle a DELETE request.
    fn delete(&self, _ctx: &RouteContext) -> Result<HttpResponse> {
        Err(Error::MethodNotAllowed)
    }

    /// Upgrade the connection to a websocket.
    ///
    /// Returns None if this resource does not speak websocket.
    fn upgrade(
        &self,
        _ctx: &RouteContext,
        _stream: web::Payload,
    ) -> Option<actix_web::Result<HttpResponse>> {
        None
    }
}

/// Request an action on a thing and start it.
///
/// Returns the description of the new action request.
fn request_action(
    thing: &Arc<RwLock<Box<dyn Thing>>>,
    action_generator: &dyn ActionGenerator,
    name: &str,
    input: Option<&serde_json::Value>,
) -> Result<serde_json::Map<String, serde_json::Value>> {
    let action = action_generator
        .generate(Arc::downgrade(thing), name.to_owned(), input)
        .ok_or_else(|| Error::ActionNotFound(name.to_owned()))?;

    let id = action.get_id();
    let action = Arc::new(RwLock::new(action));

    write_lock(thing).add_action(action.clone(), input)?;
    let description = read_lock(&action).as_action_description();

    write_lock(thing).start_action(name, &id);
    Ok(description)
}

/// Handle a GET request to / when the server manages multiple things.
struct ThingsHandler;

impl RouteHandler for ThingsHandler {
    fn get(&self, ctx: &RouteContext) -> Result<HttpResponse> {
        let descriptions: Vec<serde_json::Map<String, serde_json::Value>> = ctx
            .state
            .things
            .get_things()
            .iter()
            .map(|thing| {
                let thing = read_lock(&thing);
                let mut description = ctx.describe(&**thing);
                description.insert("href".to_owned(), json!(thing.get_href()));
                description
            })
            .collect();

        Ok(HttpResponse::Ok().json(descriptions))
    }
}

/// Handle requests to /, including websocket upgrades.
struct ThingHandler;

impl RouteHandler for ThingHandler {
    fn get(&self, ctx: &RouteContext) -> Result<HttpResponse> {
        let thing = ctx.thing()?;
        let thing = read_lock(&thing);
        Ok(HttpResponse::Ok().json(ctx.describe(&**thing)))
    }

    fn upgrade(
        &self,
        ctx: &RouteContext,
        stream: web::Payload,
    ) -> Option<actix_web::Result<HttpResponse>> {
        let thing = match ctx.thing() {
            Ok(thing) => thing,
            Err(e) => return Some(Err(e.into())),
        };

        let ws = ThingWebSocket {
            id: Uuid::new_v4().to_string(),
            thing,
            action_generator: ctx.state.action_generator.clone(),
        };
        Some(ws::start(ws, ctx.req, stream))
    }
}

/// Handle requests to /properties.
struct PropertiesHandler;

impl RouteHandler for PropertiesHandler {
    fn get(&self, ctx: &RouteContext) -> Result<HttpResponse> {
        let thing = ctx.thing()?;
        let properties = read_lock(&thing).get_properties();
        Ok(HttpResponse::Ok().json(properties))
    }
}

/// Handle requests to /properties/<property>.
struct PropertyHandler;

impl RouteHandler for PropertyHandler {
    fn get(&self, ctx: &RouteContext) -> Result<HttpResponse> {
        let thing = ctx.thing()?;
        let property_name = ctx.param("property_name")?;

        let value = read_lock(&thing).get_property(property_name);
        match value {
            Some(value) => Ok(HttpResponse::Ok().json(json!({ property_name: value }))),
            None => Err(Error::PropertyNotFound(property_name.to_owned())),
        }
    }

    fn put(&self, ctx: &RouteContext) -> Result<HttpResponse> {
        let thing = ctx.thing()?;
        let property_name = ctx.param("property_name")?;
        let value = ctx.body()?.get(property_name).ok_or_else(|| {
            Error::BadRequest(format!("Request body is missing {}", property_name))
        })?;

        let mut thing = write_lock(&thing);
        if !thing.has_property(property_name) {
            return Err(Error::PropertyNotFound(property_name.to_owned()));
        }

        thing.set_property(property_name, value.clone())?;
        let value = thing.get_property(property_name);
        Ok(HttpResponse::Ok().json(json!({ property_name: value })))
    }
}

/// Handle requests to /actions.
struct ActionsHandler;

impl RouteHandler for ActionsHandler {
    fn get(&self, ctx: &RouteContext) -> Result<HttpResponse> {
        let thing = ctx.thing()?;
        let descriptions = read_lock(&thing).get_action_descriptions(None);
        Ok(HttpResponse::Ok().json(descriptions))
    }

    fn post(&self, ctx: &RouteContext) -> Result<HttpResponse> {
        let thing = ctx.thing()?;
        let body = ctx.body()?;

        let mut requests = body.iter();
        let (name, params) = match (requests.next(), requests.next()) {
            (Some(request), None) => request,
            _ => {
                return Err(Error::BadRequest(
                    "Request must name exactly one action".to_owned(),
                ))
            }
        };

        let description = request_action(
            &thing,
            ctx.state.action_generator.as_ref(),
            name,
            params.get("input"),
        )?;
        Ok(HttpResponse::Created().json(description))
    }
}

/// Handle requests to /actions/<action_name>.
struct ActionHandler;

impl RouteHandler for ActionHandler {
    fn get(&self, ctx: &RouteContext) -> Result<HttpResponse> {
        let thing = ctx.thing()?;
        let action_name = ctx.param("action_name")?;
        let descriptions = read_lock(&thing).get_action_descriptions(Some(action_name));
        Ok(HttpResponse::Ok().json(descriptions))
    }

    fn post(&self, ctx: &RouteContext) -> Result<HttpResponse> {
        let thing = ctx.thing()?;
        let action_name = ctx.param("action_name")?;
        let params = ctx.body()?.get(action_name).ok_or_else(|| {
            Error::BadRequest(format!("Request body is missing {}", action_name))
        })?;

        let description = request_action(
            &thing,
            ctx.state.action_generator.as_ref(),
            action_name,
            params.get("input"),
        )?;
        Ok(HttpResponse::Created().json(description))
    }
}

/// Handle requests to /actions/<action_name>/<action_id>.
struct ActionIdHandler;

impl ActionIdHandler {
    fn ids<'a>(ctx: &'a RouteContext) -> Result<(&'a str, &'a str)> {
        Ok((ctx.param("action_name")?, ctx.param("action_id")?))
    }
}

impl RouteHandler for ActionIdHandler {
    fn get(&self, ctx: &RouteContext) -> Result<HttpResponse> {
        let thing = ctx.thing()?;
        let (action_name, action_id) = ActionIdHandler::ids(ctx)?;

        let action = read_lock(&thing)
            .get_action(action_name, action_id)
            .ok_or_else(|| Error::ActionRequestNotFound(action_id.to_owned()))?;
        let description = read_lock(&action).as_action_description();
        Ok(HttpResponse::Ok().json(description))
    }

    fn put(&self, ctx: &RouteContext) -> Result<HttpResponse> {
        let thing = ctx.thing()?;
        let (action_name, action_id) = ActionIdHandler::ids(ctx)?;

        let action = read_lock(&thing).get_action(action_name, action_id);
        match action {
            Some(_) => Ok(HttpResponse::Ok().finish()),
            None => Err(Error::ActionRequestNotFound(action_id.to_owned())),
        }
    }

    fn delete(&self, ctx: &RouteContext) -> Result<HttpResponse> {
        let thing = ctx.thing()?;
        let (action_name, action_id) = ActionIdHandler::ids(ctx)?;

        if write_lock(&thing).remove_action(action_name, action_id) {
            Ok(HttpResponse::NoContent().finish())
        } else {
            Err(Error::ActionRequestNotFound(action_id.to_owned()))
        }
    }
}

/// Handle requests to /events.
struct EventsHandler;

impl RouteHandler for EventsHandler {
    fn get(&self, ctx: &RouteContext) -> Result<HttpResponse> {
        let thing = ctx.thing()?;
        let descriptions = read_lock(&thing).get_event_descriptions(None);
        Ok(HttpResponse::Ok().json(descriptions))
    }
}

/// Handle requests to /events/<event_name>.
struct EventHandler;

impl RouteHandler for EventHandler {
    fn get(&self, ctx: &RouteContext) -> Result<HttpResponse> {
        let thing = ctx.thing()?;
        let event_name = ctx.param("event_name")?;
        let descriptions = read_lock(&thing).get_event_descriptions(Some(event_name));
        Ok(HttpResponse::Ok().json(descriptions))
    }
}

fn is_websocket_upgrade(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::UPGRADE)
        .and_then(|h| h.to_str().ok())
        .map_or(false, |h| h.eq_ignore_ascii_case("websocket"))
}

async fn read_body(mut payload: web::Payload) -> Result<Option<serde_json::Value>> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| Error::BadRequest(e.to_string()))?;
        if body.len() + chunk.len() > MAX_BODY_SIZE {
            return Err(Error::BadRequest("Request body too large".to_owned()));
        }
        body.extend_from_slice(&chunk);
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice(&body)
        .map(Some)
        .map_err(|e| Error::BadRequest(format!("Invalid JSON body: {}", e)))
}

/// Resolve a request against the route table and run its handler.
async fn dispatch(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> actix_web::Result<HttpResponse> {
    let (handler, params) = match state.router.resolve(req.path()) {
        Some(route) => route,
        None => return Ok(HttpResponse::NotFound().json(json!({"error": "Not found"}))),
    };

    let method = req.method().as_str().to_owned();
    if method == "OPTIONS" {
        return Ok(HttpResponse::NoContent().finish());
    }

    let mut ctx = RouteContext {
        req: &req,
        state: &state,
        params,
        body: None,
    };

    if method == "GET" && is_websocket_upgrade(&req) {
        if let Some(response) = handler.upgrade(&ctx, payload) {
            return response;
        }
        return Ok(handler.get(&ctx)?);
    }

    ctx.body = read_body(payload).await?;

    let response = match method.as_str() {
        "GET" | "HEAD" => handler.get(&ctx),
        "PUT" => handler.put(&ctx),
        "POST" => handler.post(&ctx),
        "DELETE" => handler.delete(&ctx),
        _ => Err(Error::MethodNotAllowed),
    };

    Ok(response?)
}

/// Middleware rejecting requests whose Host header is not allow-listed.
pub struct HostValidator;

impl<S, B> Transform<S, ServiceRequest> for HostValidator
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = HostValidatorMiddleware<S>;
    type Future = Ready<std::result::Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(HostValidatorMiddleware { service }))
    }
}

/// Service produced by `HostValidator`.
pub struct HostValidatorMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for HostValidatorMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // HTTP/2 carries the host in the request URI instead of a header.
        let host = req
            .headers()
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| req.uri().authority().map(|a| a.as_str()));
        let allowed = req
            .app_data::<web::Data<AppState>>()
            .map_or(true, |state| state.validate_host(host));

        if !allowed {
            debug!("Rejecting request with Host {:?}", host);
            let response = HttpResponse::Forbidden()
                .json(json!({"error": "Invalid Host header"}))
                .map_into_right_body();
            let (req, _) = req.into_parts();
            return Box::pin(async move { Ok(ServiceResponse::new(req, response)) });
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
    }
}

/// Build the actix application serving the given state.
pub fn build_app(
    state: web::Data<AppState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Response = ServiceResponse<impl MessageBody>,
        Config = (),
        InitError = (),
        Error = actix_web::Error,
    >,
> {
    App::new()
        .app_data(state)
        .wrap(
            middleware::DefaultHeaders::new()
                .add(("Access-Control-Allow-Origin", "*"))
                .add((
                    "Access-Control-Allow-Headers",
                    "Origin, X-Requested-With, Content-Type, Accept",
                ))
                .add((
                    "Access-Control-Allow-Methods",
                    "GET, HEAD, PUT, POST, DELETE, OPTIONS",
                )),
        )
        .wrap(HostValidator)
        .wrap(middleware::Logger::default())
        .default_service(web::to(dispatch))
}

/// Message pushed to a websocket actor for delivery to its client.
#[derive(Message)]
#[rtype(result = "()")]
struct TextMessage(String);

/// Subscriber delivering messages through a websocket actor's mailbox.
struct WebSocketSubscriber(Recipient<TextMessage>);

impl Subscriber for WebSocketSubscriber {
    fn send(&self, message: String) -> Result<()> {
        if !self.0.connected() {
            return Err(Error::Delivery("websocket closed".to_owned()));
        }

        self.0.do_send(TextMessage(message));
        Ok(())
    }
}

/// Shared state used by individual websockets.
struct ThingWebSocket {
    id: String,
    thing: Arc<RwLock<Box<dyn Thing>>>,
    action_generator: Arc<dyn ActionGenerator>,
}

fn ws_error(status: &str, message: &str, request: Option<&serde_json::Value>) -> String {
    let mut data = json!({
        "status": status,
        "message": message,
    });
    if let Some(request) = request {
        data["request"] = request.clone();
    }

    json!({
        "messageType": "error",
        "data": data,
    })
    .to_string()
}

impl ThingWebSocket {
    /// Handle one client message.
    ///
    /// Returns the error message to send back, if any.
    fn handle_message(&self, text: &str) -> std::result::Result<(), String> {
        let message: serde_json::Value = serde_json::from_str(text)
            .map_err(|_| ws_error("400 Bad Request", "Parsing request failed", None))?;

        let (msg_type, data) = match (
            message.get("messageType").and_then(|t| t.as_str()),
            message.get("data").and_then(|d| d.as_object()),
        ) {
            (Some(msg_type), Some(data)) => (msg_type, data),
            _ => {
                return Err(ws_error(
                    "400 Bad Request",
                    "Invalid message",
                    Some(&message),
                ))
            }
        };

        match msg_type {
            "setProperty" => {
                let mut thing = write_lock(&self.thing);
                for (property_name, property_value) in data {
                    if !thing.has_property(property_name) {
                        let e = Error::PropertyNotFound(property_name.clone());
                        return Err(ws_error("404 Not Found", &e.to_string(), Some(&message)));
                    }

                    if let Err(e) = thing.set_property(property_name, property_value.clone()) {
                        let status = if e.is_read_only() {
                            "403 Forbidden"
                        } else {
                            "400 Bad Request"
                        };
                        return Err(ws_error(status, &e.to_string(), Some(&message)));
                    }
                }
            }
            "requestAction" => {
                for (action_name, action_params) in data {
                    request_action(
                        &self.thing,
                        self.action_generator.as_ref(),
                        action_name,
                        action_params.get("input"),
                    )
                    .map_err(|e| {
                        ws_error(
                            "400 Bad Request",
                            &format!("Failed to start action: {}", e),
                            Some(&message),
                        )
                    })?;
                }
            }
            "addEventSubscription" => {
                let mut thing = write_lock(&self.thing);
                for event_name in data.keys() {
                    thing.add_event_subscriber(event_name, &self.id);
                }
            }
            unknown => {
                return Err(ws_error(
                    "400 Bad Request",
                    &format!("Unknown messageType: {}", unknown),
                    Some(&message),
                ))
            }
        }

        Ok(())
    }
}

impl Actor for ThingWebSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        debug!("Websocket {} connected", self.id);
        let subscriber = WebSocketSubscriber(ctx.address().recipient());
        write_lock(&self.thing).add_subscriber(self.id.clone(), Box::new(subscriber));
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        debug!("Websocket {} disconnected", self.id);
        write_lock(&self.thing).remove_subscriber(&self.id);
    }
}

impl Handler<TextMessage> for ThingWebSocket {
    type Result = ();

    fn handle(&mut self, msg: TextMessage, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<std::result::Result<ws::Message, ws::ProtocolError>> for ThingWebSocket {
    fn handle(
        &mut self,
        msg: std::result::Result<ws::Message, ws::ProtocolError>,
        ctx: &mut Self::Context,
    ) {
        match msg {
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Text(text)) => {
                if let Err(reply) = self.handle_message(&text) {
                    ctx.text(reply);
                }
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(_) => (),
            Err(e) => {
                warn!("Websocket {} protocol error: {}", self.id, e);
                ctx.stop();
            }
        }
    }
}

/// Server to represent a Web Thing over HTTP.
pub struct WebThingServer {
    things: ThingsType,
    base_path: String,
    port: Option<u16>,
    hostname: Option<String>,
    ssl_options: Option<(String, String)>,
    action_generator: Arc<dyn ActionGenerator>,
    disable_host_validation: bool,
}

impl WebThingServer {
    /// Create a new WebThingServer.
    ///
    /// things -- list of Things managed by this server
    /// port -- port to listen on (defaults to 80, or 443 with TLS)
    /// hostname -- Optional host name, i.e. mything.com
    /// ssl_options -- tuple of private key and certificate chain file paths
    /// action_generator -- action generator struct
    /// base_path -- base URL path to use, rather than '/'
    /// disable_host_validation -- whether or not to disable host validation
    pub fn new(
        things: ThingsType,
        port: Option<u16>,
        hostname: Option<String>,
        ssl_options: Option<(String, String)>,
        action_generator: Box<dyn ActionGenerator>,
        base_path: Option<String>,
        disable_host_validation: Option<bool>,
    ) -> WebThingServer {
        WebThingServer {
            things,
            base_path: base_path.unwrap_or_default(),
            port,
            hostname,
            ssl_options,
            action_generator: Arc::from(action_generator),
            disable_host_validation: disable_host_validation.unwrap_or(false),
        }
    }

    /// Get the port this server listens on.
    pub fn port(&self) -> u16 {
        match (self.port, &self.ssl_options) {
            (Some(port), _) => port,
            (None, Some(_)) => 443,
            (None, None) => 80,
        }
    }

    /// Get the Host header values this server accepts.
    pub fn hosts(&self) -> Vec<String> {
        let mut hosts = vec!["localhost".to_owned()];
        hosts.extend(get_addresses());

        match hostname::get() {
            Ok(name) => {
                if let Some(name) = name.to_str() {
                    hosts.push(format!("{}.local", name.to_lowercase()));
                }
            }
            Err(e) => warn!("Failed to read system host name: {}", e),
        }

        if let Some(hostname) = &self.hostname {
            hosts.push(hostname.to_lowercase());
        }

        let port = self.port();
        let with_port: Vec<String> = hosts.iter().map(|h| format!("{}:{}", h, port)).collect();
        hosts.extend(with_port);
        hosts
    }

    /// Bind the listening socket and return the running server.
    ///
    /// The returned server must be awaited to serve requests.
    pub fn start(&self) -> std::io::Result<Server> {
        let port = self.port();
        let hosts = if self.disable_host_validation {
            None
        } else {
            Some(self.hosts())
        };

        let state = web::Data::new(AppState::new(
            self.things.clone(),
            self.action_generator.clone(),
            &self.base_path,
            hosts,
        ));

        let server = HttpServer::new(move || build_app(state.clone()));

        #[cfg(feature = "ssl")]
        {
            if let Some((key, cert)) = &self.ssl_options {
                let mut builder = SslAcceptor::mozilla_intermediate(SslMethod::tls())?;
                builder.set_private_key_file(key, SslFiletype::PEM)?;
                builder.set_certificate_chain_file(cert)?;

                let server = server.bind_openssl(("0.0.0.0", port), builder)?;
                info!("Listening on https://0.0.0.0:{}", port);
                return Ok(server.run());
            }
        }

        #[cfg(not(feature = "ssl"))]
        {
            if self.ssl_options.is_some() {
                warn!("TLS options ignored, webthing was built without the ssl feature");
            }
        }

        let server = server.bind(("0.0.0.0", port))?;
        info!("Listening on http://0.0.0.0:{}", port);
        Ok(server.run())
    }
}
