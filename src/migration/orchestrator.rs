use log::{debug, info};
use serde_json::{json, Value};

use super::errors::ErrorLog;
use super::remap::IdRemapper;
use super::report::RunReport;
use super::sync::{PassReport, Synchronizer};
use crate::client::{EnvironmentClient, MutableEnvironment};
use crate::error::MigrationError;
use crate::model::item::{id_of, is_custom_ticket_field, Item};
use crate::model::resource::ResourceType;

/// Runs reset and copy passes in dependency order and owns the id mappings for the run.
pub struct Migrator<'a, S: ?Sized, T: ?Sized> {
    sync: Synchronizer<'a, S, T>,
    remapper: IdRemapper,
}

impl<'a, S, T> Migrator<'a, S, T>
where
    S: EnvironmentClient + ?Sized,
    T: MutableEnvironment + ?Sized,
{
    pub fn new(source: &'a S, target: &'a T) -> Self {
        Self {
            sync: Synchronizer::new(source, target),
            remapper: IdRemapper::new(),
        }
    }

    pub fn remapper(&self) -> &IdRemapper {
        &self.remapper
    }

    /// Reset every type, then copy every type.
    ///
    /// Passes are appended to `report` as they finish, so it still holds the
    /// completed passes when a fatal error ends the run early.
    pub async fn run(&mut self, report: &mut RunReport) -> Result<(), MigrationError> {
        self.reset(&ResourceType::RESET_ORDER, report).await?;
        self.copy(&ResourceType::COPY_ORDER, report).await
    }

    /// Reset the given types, always in reset order whatever order they are passed in.
    pub async fn reset(&mut self, types: &[ResourceType], report: &mut RunReport) -> Result<(), MigrationError> {
        for resource in in_order(&ResourceType::RESET_ORDER, types) {
            let pass = match resource {
                ResourceType::TicketField => self.sync.reset(resource, is_custom_ticket_field).await?,
                _ => self.sync.reset(resource, |_| true).await?,
            };
            log_pass(&pass);
            report.passes.push(pass);
        }
        Ok(())
    }

    /// Copy the given types in copy order. References into types that were not
    /// copied during this run cannot be translated and are dropped.
    pub async fn copy(&mut self, types: &[ResourceType], report: &mut RunReport) -> Result<(), MigrationError> {
        for resource in in_order(&ResourceType::COPY_ORDER, types) {
            let pass = self
                .sync
                .copy(resource, &mut self.remapper, transform_for(resource), move |old, new, remapper| {
                    if resource.is_referenced() {
                        remapper.record_items(resource, old, new);
                    }
                })
                .await?;
            log_pass(&pass);
            if resource.is_referenced() {
                debug!("{} {resource} ids mapped", self.remapper.mapped(resource));
            }
            report.passes.push(pass);
        }
        Ok(())
    }
}

fn in_order(order: &[ResourceType], wanted: &[ResourceType]) -> Vec<ResourceType> {
    order.iter().copied().filter(|rt| wanted.contains(rt)).collect()
}

fn log_pass(pass: &PassReport) {
    info!(
        "{}: {} of {} done, {} skipped, {} failed",
        pass.label(),
        pass.succeeded,
        pass.fetched,
        pass.skipped,
        pass.failed()
    );
}

type Transform = fn(Item, &IdRemapper, &mut ErrorLog) -> Option<Item>;

/// Per-type rewrite applied to each source item before it is created.
pub fn transform_for(resource: ResourceType) -> Transform {
    match resource {
        ResourceType::Group => keep_item,
        ResourceType::TicketField => custom_fields_only,
        ResourceType::TicketForm => prepare_ticket_form,
        ResourceType::Automation => prepare_automation,
        ResourceType::Trigger => prepare_trigger,
        ResourceType::Macro => prepare_macro,
    }
}

fn keep_item(item: Item, _: &IdRemapper, _: &mut ErrorLog) -> Option<Item> {
    Some(item)
}

fn custom_fields_only(item: Item, _: &IdRemapper, _: &mut ErrorLog) -> Option<Item> {
    is_custom_ticket_field(&item).then_some(item)
}

/// Forms point at the target's fields and are visible on every brand.
fn prepare_ticket_form(mut form: Item, remapper: &IdRemapper, _: &mut ErrorLog) -> Option<Item> {
    if let Some(Value::Array(ids)) = form.get("ticket_field_ids") {
        let translated = remapper.rewrite_field_ids(ids);
        debug!(
            "ticket_form {:?}: {} of {} fields mapped",
            id_of(&form),
            translated.len(),
            ids.len()
        );
        form.insert("ticket_field_ids".into(), json!(translated));
    }
    form.insert("in_all_brands".into(), Value::Bool(true));
    form.remove("restricted_brand_ids");
    Some(form)
}

fn prepare_automation(mut rule: Item, remapper: &IdRemapper, errors: &mut ErrorLog) -> Option<Item> {
    remapper.rewrite_rule(&mut rule, ResourceType::Automation, errors);
    Some(rule)
}

fn prepare_trigger(mut rule: Item, remapper: &IdRemapper, errors: &mut ErrorLog) -> Option<Item> {
    remapper.rewrite_rule(&mut rule, ResourceType::Trigger, errors);
    Some(rule)
}

fn prepare_macro(mut rule: Item, remapper: &IdRemapper, errors: &mut ErrorLog) -> Option<Item> {
    remapper.rewrite_rule(&mut rule, ResourceType::Macro, errors);
    Some(rule)
}
