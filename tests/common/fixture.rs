//! Workflow over an in-memory store, populated with a small organisation.

use docflow::{
    Workflow,
    audit::Caller,
    events::Event,
    models::{Category, Document, NewCategory, NewTemplate, Template, template::{FieldKind, FieldSpec, Schema}},
    permissions::{ActorProfile, Role, StaticDirectory},
    store::MemoryStore,
    workflow::Draft,
};
use failure::Error;
use std::sync::{Arc, Mutex};

/// IDs of actors in the fixture's directory.
pub mod actors {
    /// Administrator, outside of any department.
    pub const ADMIN: i32 = 1;
    /// Head of the Quality department.
    pub const QUALITY_HEAD: i32 = 2;
    /// Member of the Quality department.
    pub const QUALITY: i32 = 3;
    /// Member of the Engineering department.
    pub const ENGINEERING: i32 = 4;
    /// Head of the Engineering department.
    pub const ENGINEERING_HEAD: i32 = 5;
    /// Manager in the Quality department, who is not its head.
    pub const MANAGER: i32 = 6;
    /// Former employee.
    pub const INACTIVE: i32 = 7;
}

/// Listener remembering every event it has seen.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(Event::kind).collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

pub struct Fixture {
    pub workflow: Workflow<MemoryStore, StaticDirectory>,
    pub events: Recorder,
    /// The `HP-QP` category, whose counter starts at 410.
    pub category: Category,
    /// Inspection template in `HP-QP`, requiring a `batch` field.
    pub template: Template,
}

fn actor(id: i32, name: &str, role: Role, department: Option<&str>, head: bool)
-> ActorProfile {
    ActorProfile {
        id,
        name: name.to_string(),
        role,
        department: department.map(str::to_string),
        department_head: head,
        active: true,
    }
}

pub fn directory() -> StaticDirectory {
    vec![
        actor(actors::ADMIN, "Ada", Role::Admin, None, false),
        actor(actors::QUALITY_HEAD, "Quinn", Role::Manager, Some("Quality"), true),
        actor(actors::QUALITY, "Quentin", Role::User, Some("Quality"), false),
        actor(actors::ENGINEERING, "Erin", Role::User, Some("Engineering"), false),
        actor(actors::ENGINEERING_HEAD, "Ezra", Role::Manager, Some("Engineering"), true),
        actor(actors::MANAGER, "Morgan", Role::Manager, Some("Quality"), false),
        ActorProfile {
            active: false,
            ..actor(actors::INACTIVE, "Ivan", Role::User, Some("Quality"), false)
        },
    ].into_iter().collect()
}

impl Fixture {
    pub fn new() -> Result<Fixture, Error> {
        let mut workflow = Workflow::new(MemoryStore::new(), directory());
        let events = Recorder::default();

        let sink = events.events.clone();
        workflow.listen(move |ev: &Event| -> Result<(), Error> {
            sink.lock().unwrap().push(ev.clone());
            Ok(())
        });

        let admin = Caller::new(actors::ADMIN);

        let category = workflow.create_category(&admin, &NewCategory {
            code: "HP-QP".into(),
            name: "Quality procedures".into(),
            description: String::new(),
            prefix: "HP-QP-".into(),
            next_number: 410,
        })?;

        let template = workflow.create_template(&admin, &NewTemplate {
            category: category.id,
            name: "Inspection".into(),
            description: String::new(),
            schema: Schema {
                fields: vec![
                    FieldSpec {
                        name: "batch".into(),
                        label: Some("Batch number".into()),
                        kind: FieldKind::Text,
                        required: true,
                    },
                    FieldSpec {
                        name: "passed".into(),
                        label: None,
                        kind: FieldKind::Boolean,
                        required: false,
                    },
                ],
            },
            version: "2.1".into(),
        })?;

        Ok(Fixture { workflow, events, category, template })
    }

    /// Create an untemplated draft in `HP-QP`.
    pub fn draft(&self, author: i32) -> Result<Document, Error> {
        Ok(self.workflow.create(&Caller::new(author), Draft {
            category: "HP-QP".into(),
            title: Some("Calibration of gauges".into()),
            ..Draft::default()
        })?)
    }

    /// Create a document by `author` and have it reviewed by the Quality
    /// department's head.
    pub fn reviewed(&self, author: i32) -> Result<Document, Error> {
        use docflow::lifecycle::Decision;

        let document = self.draft(author)?;
        self.workflow.submit(&Caller::new(author), document.id, None)?;
        Ok(self.workflow.review(
            &Caller::new(actors::QUALITY_HEAD), document.id, Decision::Approve, None)?)
    }
}
