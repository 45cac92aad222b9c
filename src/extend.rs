//! Typed extension registry.
//!
//! Independently loaded modules contribute handlers, methods, config
//! defaults and marker translators to the two base components. A surface
//! takes a snapshot of the registry when it is created.

use indexmap::IndexMap;
use serde_json::Value;
use std::rc::Rc;

use crate::config::{ConfigValue, default_config_map};
use crate::defs::{MarkerTranslator, Translators};
use crate::event::{Handler, HandlerKey, HandlerTable};
use crate::surface::{self, MindMap};
use crate::topic;
use crate::tree::TopicId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Surface,
    Topic,
}

/// Plain member callable by name; receives the topic it is invoked on.
pub type Method = Rc<dyn Fn(&mut MindMap, Option<TopicId>, &Value) -> Option<Value>>;

#[derive(Clone)]
pub struct Extensions {
    classes: IndexMap<String, Component>,
    surface: HandlerTable,
    topic: HandlerTable,
    methods: IndexMap<(Component, String), Method>,
    defaults: IndexMap<String, ConfigValue>,
    translators: Translators,
}

impl std::fmt::Debug for Extensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extensions")
            .field("classes", &self.classes)
            .field("surface", &self.surface)
            .field("topic", &self.topic)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("defaults", &self.defaults)
            .field("translators", &self.translators)
            .finish()
    }
}

impl Default for Extensions {
    fn default() -> Self {
        Self::standard()
    }
}

impl Extensions {
    /// Registry without any handler.
    pub fn empty() -> Self {
        Self {
            classes: IndexMap::new(),
            surface: HandlerTable::default(),
            topic: HandlerTable::default(),
            methods: IndexMap::new(),
            defaults: default_config_map(),
            translators: Translators::default(),
        }
    }

    /// Base components with their own handlers.
    pub fn base() -> Self {
        let mut ext = Self::empty();
        ext.register("MindMap", Component::Surface);
        ext.register("Topic", Component::Topic);
        surface::install(&mut ext);
        topic::install(&mut ext);
        ext
    }

    /// Base components plus drag-and-drop.
    pub fn standard() -> Self {
        let mut ext = Self::base();
        crate::drag::install(&mut ext);
        ext
    }

    /// Records `component` under a symbolic name for lookups by name.
    pub fn register(&mut self, name: impl Into<String>, component: Component) -> Option<Component> {
        self.classes.insert(name.into(), component)
    }

    pub fn lookup(&self, name: &str) -> Option<Component> {
        self.classes.get(name).copied()
    }

    pub fn table(&self, component: Component) -> &HandlerTable {
        match component {
            Component::Surface => &self.surface,
            Component::Topic => &self.topic,
        }
    }

    pub fn table_mut(&mut self, component: Component) -> &mut HandlerTable {
        match component {
            Component::Surface => &mut self.surface,
            Component::Topic => &mut self.topic,
        }
    }

    /// Merges handlers into the named component's table.
    ///
    /// A new handler runs before the ones already registered for the same
    /// key; `exclusive` replaces them instead. Returns the previous chains by
    /// key, or `None` when `name` is not registered.
    pub fn extend_handler<I>(
        &mut self,
        name: &str,
        additions: I,
        exclusive: bool,
    ) -> Option<Vec<(HandlerKey, Vec<Handler>)>>
    where
        I: IntoIterator<Item = (HandlerKey, Handler)>,
    {
        let component = self.lookup(name)?;
        Some(self.extend_component(component, additions, exclusive))
    }

    pub fn extend_component<I>(
        &mut self,
        component: Component,
        additions: I,
        exclusive: bool,
    ) -> Vec<(HandlerKey, Vec<Handler>)>
    where
        I: IntoIterator<Item = (HandlerKey, Handler)>,
    {
        let table = self.table_mut(component);
        let mut previous = Vec::new();
        for (key, handler) in additions {
            let old = table.entry(&key).cloned().unwrap_or_default();
            let chain = if exclusive || old.is_empty() {
                vec![handler]
            } else {
                let mut chain = Vec::with_capacity(old.len() + 1);
                chain.push(handler);
                chain.extend(old.iter().cloned());
                chain
            };
            table.replace(key, chain);
            previous.push((key, old));
        }
        previous
    }

    /// Overwrites named members of a component, returning the old ones.
    pub fn extend_prototype<I>(&mut self, name: &str, members: I) -> Option<IndexMap<String, Option<Method>>>
    where
        I: IntoIterator<Item = (String, Method)>,
    {
        let component = self.lookup(name)?;
        let mut previous = IndexMap::new();
        for (member, method) in members {
            let old = self.methods.insert((component, member.clone()), method);
            previous.insert(member, old);
        }
        Some(previous)
    }

    pub fn method(&self, component: Component, name: &str) -> Option<&Method> {
        self.methods.get(&(component, name.to_string()))
    }

    /// Overwrites configuration defaults, returning the old values.
    pub fn extend_defaults<'a, I>(&mut self, defaults: I) -> IndexMap<String, Option<ConfigValue>>
    where
        I: IntoIterator<Item = (&'a str, ConfigValue)>,
    {
        defaults
            .into_iter()
            .map(|(key, value)| (key.to_string(), self.defaults.insert(key.to_string(), value)))
            .collect()
    }

    pub fn defaults(&self) -> &IndexMap<String, ConfigValue> {
        &self.defaults
    }

    pub fn extend_translators<I>(&mut self, translators: I) -> IndexMap<String, Option<Rc<dyn MarkerTranslator>>>
    where
        I: IntoIterator<Item = (String, Rc<dyn MarkerTranslator>)>,
    {
        translators
            .into_iter()
            .map(|(kind, translator)| {
                let old = self.translators.insert(kind.clone(), translator);
                (kind, old)
            })
            .collect()
    }

    pub fn translators(&self) -> &Translators {
        &self.translators
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{DomEventKind, EventType, Stamp, handler};

    fn key() -> HandlerKey {
        (EventType::Dom(DomEventKind::Click), Some(Stamp::Link))
    }

    #[test]
    fn new_handlers_are_prepended_to_the_chain() {
        let mut ext = Extensions::empty();
        ext.register("Topic", Component::Topic);
        let first = handler(|_, _| Some(Value::from(1)));
        let second = handler(|_, _| Some(Value::from(2)));
        ext.extend_handler("Topic", [(key(), first.clone())], false);
        let previous = ext.extend_handler("Topic", [(key(), second.clone())], false).unwrap();
        assert_eq!(previous[0].1.len(), 1);
        let chain = ext.table(Component::Topic).chain(key().0, key().1).unwrap();
        assert_eq!(chain.len(), 2);
        assert!(Rc::ptr_eq(&chain[0], &second));
        assert!(Rc::ptr_eq(&chain[1], &first));
    }

    #[test]
    fn exclusive_extension_replaces_the_chain() {
        let mut ext = Extensions::empty();
        ext.register("Topic", Component::Topic);
        let noop = handler(|_, _| None);
        ext.extend_handler("Topic", [(key(), noop.clone()), (key(), noop.clone())], false);
        ext.extend_handler("Topic", [(key(), noop)], true);
        assert_eq!(ext.table(Component::Topic).chain(key().0, key().1).map(|c| c.len()), Some(1));
        assert!(ext.extend_handler("Nope", Vec::new(), false).is_none());
    }

    #[test]
    fn defaults_extension_reports_previous_values() {
        let mut ext = Extensions::empty();
        let old = ext.extend_defaults([("paddingX", ConfigValue::Number(4.0)), ("draggable", true.into())]);
        assert_eq!(old["paddingX"], Some(ConfigValue::Number(10.0)));
        assert_eq!(old["draggable"], None);
        assert_eq!(ext.defaults()["draggable"], ConfigValue::Bool(true));
    }
}
