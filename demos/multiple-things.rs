use log::info;
use rand::Rng;
use serde_json::json;
use std::sync::{Arc, RwLock, Weak};
use std::{thread, time};
use uuid::Uuid;
use webthing::utils::write_lock;
use webthing::{
    Action, ActionGenerator, BaseAction, BaseProperty, BaseThing, Event, Thing, ThingsType, Value,
    ValueForwarder, WebThingServer,
};

pub struct OverheatedEvent {
    data: Option<serde_json::Value>,
    time: String,
}

impl OverheatedEvent {
    fn new(data: Option<serde_json::Value>) -> OverheatedEvent {
        OverheatedEvent {
            data,
            time: webthing::utils::timestamp(),
        }
    }
}

impl Event for OverheatedEvent {
    fn get_name(&self) -> String {
        "overheated".to_owned()
    }

    fn get_data(&self) -> Option<serde_json::Value> {
        self.data.clone()
    }

    fn get_time(&self) -> String {
        self.time.clone()
    }
}

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

        thread::spawn(move || {
            let duration = input.get("duration").and_then(|d| d.as_u64()).unwrap_or(0);
            thread::sleep(time::Duration::from_millis(duration));

            let mut thing = write_lock(&thing);
            if let Some(brightness) = input.get("brightness") {
                let _ = thing.set_property("brightness", brightness.clone());
            }
            thing.add_event(Box::new(OverheatedEvent::new(Some(json!(102)))));

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

struct OnValueForwarder;

impl ValueForwarder for OnValueForwarder {
    fn set_value(&mut self, value: &serde_json::Value) -> webthing::Result<()> {
        info!("On-State is now {}", value);
        Ok(())
    }
}

struct BrightnessValueForwarder;

impl ValueForwarder for BrightnessValueForwarder {
    fn set_value(&mut self, value: &serde_json::Value) -> webthing::Result<()> {
        info!("Brightness is now {}", value);
        Ok(())
    }
}

fn metadata(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    value.as_object().cloned().unwrap_or_default()
}

/// A dimmable light that logs received commands.
fn make_light() -> Arc<RwLock<Box<dyn Thing + 'static>>> {
    let mut thing = BaseThing::new(
        "urn:dev:ops:my-lamp-1234".to_owned(),
        "My Lamp".to_owned(),
        Some(vec!["OnOffSwitch".to_owned(), "Light".to_owned()]),
        Some("A web connected lamp".to_owned()),
    );

    thing.add_property(Box::new(BaseProperty::new(
        "on".to_owned(),
        Value::new(json!(true), Some(Box::new(OnValueForwarder))),
        Some(metadata(json!({
            "@type": "OnOffProperty",
            "title": "On/Off",
            "type": "boolean",
            "description": "Whether the lamp is turned on"
        }))),
    )));

    thing.add_property(Box::new(BaseProperty::new(
        "brightness".to_owned(),
        Value::new(json!(50), Some(Box::new(BrightnessValueForwarder))),
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
                "required": ["brightness", "duration"],
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

/// A humidity sensor which updates its measurement every few seconds.
///
/// Returns the sensor and the value its reading is pushed into.
fn make_sensor() -> (Arc<RwLock<Box<dyn Thing + 'static>>>, Value) {
    let mut thing = BaseThing::new(
        "urn:dev:ops:my-humidity-sensor-1234".to_owned(),
        "My Humidity Sensor".to_owned(),
        Some(vec!["MultiLevelSensor".to_owned()]),
        Some("A web connected humidity sensor".to_owned()),
    );

    let level = Value::read_only(json!(0));
    thing.add_property(Box::new(BaseProperty::new(
        "level".to_owned(),
        level.clone(),
        Some(metadata(json!({
            "@type": "LevelProperty",
            "title": "Humidity",
            "type": "number",
            "description": "The current humidity in %",
            "minimum": 0,
            "maximum": 100,
            "unit": "percent",
            "readOnly": true
        }))),
    )));

    (Arc::new(RwLock::new(Box::new(thing))), level)
}

#[actix_rt::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let mut things: Vec<Arc<RwLock<Box<dyn Thing + 'static>>>> = Vec::new();

    // Create a thing that represents a dimmable light
    things.push(make_light());

    // Create a thing that represents a humidity sensor
    let (sensor, level) = make_sensor();
    things.push(sensor);

    thread::spawn(move || {
        let mut rng = rand::thread_rng();

        // Mimic an actual sensor updating its reading every couple seconds.
        loop {
            thread::sleep(time::Duration::from_millis(3000));
            let new_value: f64 =
                70.0 * rng.gen_range(0.0..1.0) * (-0.5 + rng.gen_range(0.0..1.0));
            let new_value = json!(new_value.abs());

            info!("setting new humidity level: {}", new_value);
            level.notify_of_external_update(new_value);
        }
    });

    let server = WebThingServer::new(
        ThingsType::Multiple(things, "LightAndTempDevice".to_owned()),
        Some(8888),
        None,
        None,
        Box::new(Generator),
        None,
        None,
    );
    server.start()?.await
}
