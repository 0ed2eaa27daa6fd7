use log::info;
use serde_json::json;
use std::sync::{Arc, RwLock, Weak};
use std::{thread, time};
use uuid::Uuid;
use webthing::utils::write_lock;
use webthing::{
    Action, ActionGenerator, BaseAction, BaseEvent, BaseProperty, BaseThing, Thing, ThingsType,
    Value, WebThingServer,
};

pub struct FadeAction(BaseAction);

impl FadeAction {
    fn new(
        input: Option<serde_json::Map<String, serde_json::Value>>,
        thing: Weak<RwLock<Box<dyn Thing>>>,
    ) -> FadeAction {
        FadeAction(BaseAction::new(
            Uuid::new_v4().to_string(),
            "fade".to_owned(),
            input,
            thing,
        ))
    }
}

impl Action for FadeAction {
    fn base(&self) -> &BaseAction {
        &self.0
    }

    fn base_mut(&mut self) -> &mut BaseAction {
        &mut self.0
    }

    fn perform_action(&mut self) {
        let (thing, input) = match (self.get_thing(), self.get_input()) {
            (Some(thing), Some(input)) => (thing, input),
            _ => return,
        };
        let name = self.get_name();
        let id = self.get_id();

        // The thing is locked while this runs, so fade on another thread.
        thread::spawn(move || {
            let duration = input.get("duration").and_then(|d| d.as_u64()).unwrap_or(0);
            thread::sleep(time::Duration::from_millis(duration));

            let mut thing = write_lock(&thing);
            if let Some(brightness) = input.get("brightness") {
                let _ = thing.set_property("brightness", brightness.clone());
            }
            thing.add_event(Box::new(BaseEvent::new(
                "overheated".to_owned(),
                Some(json!(102)),
            )));

            thing.finish_action(&name, &id);
        });
    }
}

struct Generator;

impl ActionGenerator for Generator {
    fn generate(
        &self,
        thing: Weak<RwLock<Box<dyn Thing>>>,
        name: String,
        input: Option<&serde_json::Value>,
    ) -> Option<Box<dyn Action>> {
        let input = input.and_then(|v| v.as_object().cloned());

        match name.as_str() {
            "fade" => Some(Box::new(FadeAction::new(input, thing))),
            _ => None,
        }
    }
}

fn metadata(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn make_thing() -> Arc<RwLock<Box<dyn Thing + 'static>>> {
    let mut thing = BaseThing::new(
        "urn:dev:ops:my-lamp-1234".to_owned(),
        "My Lamp".to_owned(),
        Some(vec!["OnOffSwitch".to_owned(), "Light".to_owned()]),
        Some("A web connected lamp".to_owned()),
    );

    thing.add_property(Box::new(BaseProperty::new(
        "on".to_owned(),
        Value::with_forwarder(json!(true), |v| {
            info!("On-State is now {}", v);
            Ok(())
        }),
        Some(metadata(json!({
            "@type": "OnOffProperty",
            "title": "On/Off",
            "type": "boolean",
            "description": "Whether the lamp is turned on"
        }))),
    )));

    thing.add_property(Box::new(BaseProperty::new(
        "brightness".to_owned(),
        Value::with_forwarder(json!(50), |v| {
            info!("Brightness is now {}", v);
            Ok(())
        }),
        Some(metadata(json!({
            "@type": "BrightnessProperty",
            "title": "Brightness",
            "type": "integer",
            "description": "The level of light from 0-100",
            "minimum": 0,
            "maximum": 100,
            "unit": "percent"
        }))),
    )));

    thing.add_available_action(
        "fade".to_owned(),
        metadata(json!({
            "title": "Fade",
            "description": "Fade the lamp to a given level",
            "input": {
                "type": "object",
                "required": [
                    "brightness",
                    "duration"
                ],
                "properties": {
                    "brightness": {
                        "type": "integer",
                        "minimum": 0,
                        "maximum": 100,
                        "unit": "percent"
                    },
                    "duration": {
                        "type": "integer",
                        "minimum": 1,
                        "unit": "milliseconds"
                    }
                }
            }
        })),
    );

    thing.add_available_event(
        "overheated".to_owned(),
        metadata(json!({
            "description": "The lamp has exceeded its safe operating temperature",
            "type": "number",
            "unit": "degree celsius"
        })),
    );

    Arc::new(RwLock::new(Box::new(thing)))
}

#[actix_rt::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();
    let thing = make_thing();

    // If adding more than one thing, use ThingsType::Multiple() with a name.
    let server = WebThingServer::new(
        ThingsType::Single(thing),
        Some(8888),
        None,
        None,
        Box::new(Generator),
        None,
        None,
    );
    server.start()?.await
}
