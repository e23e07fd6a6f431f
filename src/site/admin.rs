//! `admin-dialog`: CRUD for one content collection
//!
//! ```html
//! <admin-dialog resource="ministries"></admin-dialog>
//! ```
//!
//! The list lives in the store under `admin.<resource>`, so every dialog
//! (and anything else) watching the same collection re-renders when one of
//! them saves. Form values are read from the rendered inputs at submit time.
//!
//! Events:
//!
//! | Event     | Detail         | Effect                                     |
//! |-----------|----------------|--------------------------------------------|
//! | `save`    | -              | create (empty `id` input) or update        |
//! | `edit`    | item id        | fill the form with that item               |
//! | `cancel`  | -              | clear the form                             |
//! | `remove`  | item id        | delete the item                            |

use crate::api::{Api, ApiFuture, FetchError};
use crate::component::{Component, Handled, Markup, Scope, Tag};
use crate::host::ComponentHandle;
use crate::store::Store;
use serde_json::{json, Map, Value};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminResource {
    Ministries,
    Testimonials,
    LifeGroups,
    Give,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Line,
    Text,
}

struct Field {
    name: &'static str,
    label: &'static str,
    kind: FieldKind,
    required: bool,
}

const fn field(name: &'static str, label: &'static str, kind: FieldKind, required: bool) -> Field {
    Field {
        name,
        label,
        kind,
        required,
    }
}

const MINISTRY_FIELDS: &[Field] = &[
    field("name", "Name", FieldKind::Line, true),
    field("leader", "Leader", FieldKind::Line, false),
    field("image", "Image URL", FieldKind::Line, false),
    field("description", "Description", FieldKind::Text, false),
];

const TESTIMONIAL_FIELDS: &[Field] = &[
    field("name", "Name", FieldKind::Line, true),
    field("quote", "Quote", FieldKind::Text, true),
];

const LIFE_GROUP_FIELDS: &[Field] = &[
    field("name", "Name", FieldKind::Line, true),
    field("leader", "Leader", FieldKind::Line, false),
    field("day", "Meeting day", FieldKind::Line, false),
    field("location", "Location", FieldKind::Line, false),
    field("description", "Description", FieldKind::Text, false),
];

const GIVE_FIELDS: &[Field] = &[
    field("label", "Label", FieldKind::Line, true),
    field("url", "Link", FieldKind::Line, false),
    field("description", "Description", FieldKind::Text, false),
];

impl AdminResource {
    pub const ALL: [AdminResource; 4] = [
        Self::Ministries,
        Self::Testimonials,
        Self::LifeGroups,
        Self::Give,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.name() == name.trim())
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ministries => "ministries",
            Self::Testimonials => "testimonials",
            Self::LifeGroups => "life-groups",
            Self::Give => "give",
        }
    }

    pub fn path(self) -> String {
        format!("admin/{}", self.name())
    }

    pub fn store_key(self) -> String {
        format!("admin.{}", self.name())
    }

    fn title(self) -> &'static str {
        match self {
            Self::Ministries => "Ministries",
            Self::Testimonials => "Testimonials",
            Self::LifeGroups => "Life Groups",
            Self::Give => "Giving Options",
        }
    }

    fn fields(self) -> &'static [Field] {
        match self {
            Self::Ministries => MINISTRY_FIELDS,
            Self::Testimonials => TESTIMONIAL_FIELDS,
            Self::LifeGroups => LIFE_GROUP_FIELDS,
            Self::Give => GIVE_FIELDS,
        }
    }

    /// Text identifying an item in the list
    fn label(self, item: &Value) -> String {
        field_text(item, self.fields()[0].name)
    }
}

pub struct AdminDialog {
    api: Rc<dyn Api>,
    store: Store,
    resource: Option<AdminResource>,
}

impl AdminDialog {
    pub fn new(api: Rc<dyn Api>, store: Store) -> Self {
        Self {
            api,
            store,
            resource: None,
        }
    }

    fn save(&self, this: &ComponentHandle, resource: AdminResource) {
        let mut body = Map::new();
        for field in resource.fields() {
            let value = this.input(field.name).unwrap_or_default().trim().to_string();
            if field.required && value.is_empty() {
                this.set("error", json!(format!("{} is required.", field.label)));
                this.render();
                return;
            }
            body.insert(field.name.to_string(), Value::String(value));
        }

        let id = this.input("id").unwrap_or_default();
        let request = match id.trim() {
            "" => self.api.post(&resource.path(), Value::Object(body)),
            id => self
                .api
                .put(&format!("{}/{}", resource.path(), id), Value::Object(body)),
        };
        self.mutate(this, resource, request, "Saved.");
    }

    fn remove(&self, this: &ComponentHandle, resource: AdminResource, id: &str) {
        let request = self.api.delete(&format!("{}/{}", resource.path(), id));
        self.mutate(this, resource, request, "Deleted.");
    }

    /// Run a write, then reload the collection into the store
    fn mutate(
        &self,
        this: &ComponentHandle,
        resource: AdminResource,
        request: ApiFuture,
        done: &'static str,
    ) {
        this.set("error", Value::Null);
        this.set("saving", json!(true));
        this.render();

        let api = self.api.clone();
        let store = self.store.clone();
        let task = this.clone();
        this.spawn(async move {
            let result = request.await;
            if !task.is_attached() {
                tracing::debug!("admin-dialog closed before {} finished", resource.path());
                return;
            }
            task.set("saving", json!(false));
            match result {
                Ok(_) => {
                    tracing::info!("{} {}", resource.path(), done.trim_end_matches('.').to_lowercase());
                    task.set("editing", Value::Null);
                    task.set("notice", json!(done));
                    let list = api.get(&resource.path()).await;
                    apply_list(&task, &store, resource, list);
                }
                Err(e) => {
                    tracing::warn!("Writing {} failed: {}", resource.path(), e);
                    task.set("error", json!(e.user_message()));
                    task.render();
                }
            }
        });
    }
}

/// Put a loaded list into the store (which re-renders every watcher)
fn apply_list(
    task: &ComponentHandle,
    store: &Store,
    resource: AdminResource,
    result: Result<Value, FetchError>,
) {
    if !task.is_attached() {
        return;
    }
    task.set("loading", json!(false));
    match result {
        Ok(Value::Array(items)) => store.set(resource.store_key(), Value::Array(items)),
        Ok(other) => {
            tracing::warn!("{} returned a non-list: {}", resource.path(), other);
            task.set("error", json!("The list could not be read."));
        }
        Err(e) => {
            tracing::warn!("Loading {} failed: {}", resource.path(), e);
            task.set("error", json!(e.user_message()));
        }
    }
    task.render();
}

impl Component for AdminDialog {
    fn tag(&self) -> &'static str {
        "admin-dialog"
    }

    fn on_attach(&mut self, this: &ComponentHandle) {
        self.resource = this
            .attr_text("resource")
            .as_deref()
            .and_then(AdminResource::parse);
        let Some(resource) = self.resource else {
            tracing::warn!(
                "admin-dialog with unknown resource {:?}",
                this.attr_text("resource")
            );
            this.set("error", json!("Unknown admin section."));
            this.render();
            return;
        };

        let key = resource.store_key();
        if let Some(items) = self.store.get(&key) {
            this.set("items", items);
        }
        this.subscribe(&self.store, move |this, state| {
            let Some(items) = state.get(&key) else {
                return;
            };
            if this.get("items").as_ref() != Some(items) {
                this.set("items", items.clone());
                this.render();
            }
        });

        this.set("resource", json!(resource.name()));
        this.set("loading", json!(true));
        this.render();

        let request = self.api.get(&resource.path());
        let store = self.store.clone();
        let task = this.clone();
        this.spawn(async move {
            let result = request.await;
            apply_list(&task, &store, resource, result);
        });
    }

    fn on_event(&mut self, this: &ComponentHandle, event: &str, detail: &Value) -> Handled {
        let Some(resource) = self.resource else {
            return Handled::No;
        };
        if this.get_as::<bool>("saving") == Some(true) {
            tracing::debug!("admin-dialog busy, ignoring {:?}", event);
            return Handled::Yes;
        }
        this.set("notice", Value::Null);

        match event {
            "save" | "submit" => self.save(this, resource),
            "edit" => {
                let item = detail_id(detail).and_then(|id| {
                    this.get_as::<Vec<Value>>("items")
                        .unwrap_or_default()
                        .into_iter()
                        .find(|item| field_text(item, "id") == id)
                });
                match item {
                    Some(item) => {
                        this.set("error", Value::Null);
                        this.set("editing", item);
                    }
                    None => {
                        this.set("error", json!("That entry no longer exists."));
                    }
                }
                this.render();
            }
            "cancel" => {
                this.set("editing", Value::Null);
                this.set("error", Value::Null);
                this.render();
            }
            "remove" => match detail_id(detail) {
                Some(id) => self.remove(this, resource, &id),
                None => return Handled::No,
            },
            _ => return Handled::No,
        }
        Handled::Yes
    }

    fn render(&self, scope: &Scope<'_>) -> Markup {
        let Some(resource) = scope.get_str("resource").and_then(AdminResource::parse) else {
            return Tag::new("p")
                .class("error")
                .attr_text("role", "alert")
                .text(scope.get_str("error").unwrap_or("Unknown admin section."))
                .into_markup();
        };

        let mut section = Tag::new("section")
            .class(&format!("admin admin-{}", resource.name()))
            .child(
                Tag::new("h2")
                    .text(&format!("Manage {}", resource.title()))
                    .into_markup(),
            );

        if let Some(error) = scope.get_str("error") {
            section = section.child(
                Tag::new("p")
                    .class("error")
                    .attr_text("role", "alert")
                    .text(error)
                    .into_markup(),
            );
        }
        if let Some(notice) = scope.get_str("notice") {
            section = section.child(Tag::new("p").class("notice").text(notice).into_markup());
        }

        section = if scope.flag("loading") {
            section.child(Tag::new("p").class("loading").text("Loading…").into_markup())
        } else {
            section.child(item_list(resource, scope))
        };

        section.child(form(resource, scope)).into_markup()
    }
}

fn item_list(resource: AdminResource, scope: &Scope<'_>) -> Markup {
    let items: Vec<Value> = scope.get_as("items").unwrap_or_default();
    if items.is_empty() {
        return Tag::new("p").class("empty").text("No entries yet.").into_markup();
    }

    let rows: Markup = items
        .iter()
        .map(|item| {
            let id = field_text(item, "id");
            Tag::new("li")
                .attr_text("data-id", &id)
                .child(Tag::new("span").text(&resource.label(item)).into_markup())
                .child(button("edit", &id, "Edit"))
                .child(button("remove", &id, "Delete"))
                .into_markup()
        })
        .collect();
    Tag::new("ul").class("admin-list").child(rows).into_markup()
}

fn button(action: &str, id: &str, label: &str) -> Markup {
    Tag::new("button")
        .attr_text("type", "button")
        .attr_text("data-action", action)
        .attr_text("data-id", id)
        .text(label)
        .into_markup()
}

fn form(resource: AdminResource, scope: &Scope<'_>) -> Markup {
    let editing = scope.get("editing").filter(|e| e.is_object());
    let value = |name: &str| editing.map(|item| field_text(item, name)).unwrap_or_default();

    let mut form = Tag::new("form").class("admin-form").attr_text("data-action", "save");
    form = form.child(
        Tag::void("input")
            .attr_text("type", "hidden")
            .attr_text("name", "id")
            .attr_text("value", &value("id"))
            .into_markup(),
    );

    for field in resource.fields() {
        let control = match field.kind {
            FieldKind::Line => Tag::void("input")
                .attr_text("type", "text")
                .attr_text("name", field.name)
                .attr_text("value", &value(field.name))
                .flag("required", field.required)
                .into_markup(),
            FieldKind::Text => Tag::new("textarea")
                .attr_text("name", field.name)
                .flag("required", field.required)
                .text(&value(field.name))
                .into_markup(),
        };
        form = form.child(
            Tag::new("label")
                .text(field.label)
                .child(control)
                .into_markup(),
        );
    }

    let submit = if editing.is_some() { "Save changes" } else { "Add" };
    form = form.child(
        Tag::new("button")
            .attr_text("type", "submit")
            .flag("disabled", scope.flag("saving"))
            .text(submit)
            .into_markup(),
    );
    if editing.is_some() {
        form = form.child(button("cancel", "", "Cancel"));
    }
    form.into_markup()
}

/// String form of a scalar field (`id` may be a number or a string)
fn field_text(item: &Value, name: &str) -> String {
    match item.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Item id from an event detail: `3`, `"3"` or `{"id": 3}`
fn detail_id(detail: &Value) -> Option<String> {
    let id = match detail {
        Value::Object(_) => field_text(detail, "id"),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    };
    let id = id.trim().to_string();
    (!id.is_empty()).then_some(id)
}
