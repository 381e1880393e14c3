//! Microformats2 parsing
//!
//! Turns an HTML document into a tree of typed items. Roots are elements with
//! `h-*` classes; `p-*`, `u-*`, `dt-*` and `e-*` classes attach property values
//! to the nearest enclosing root. A root that is also a property becomes a
//! nested `PropertyValue::Node` of that property, otherwise a child item.

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::LazyLock;
use url::Url;

static REL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[rel][href], link[rel][href]").unwrap());

/// A property value: either plain text or a nested item
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Node(Box<Item>),
}

/// A microformat item
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    /// Root class names, e.g. `h-entry`
    pub types: Vec<String>,
    /// Property name (without prefix) -> values in document order
    pub properties: HashMap<String, Vec<PropertyValue>>,
    /// Nested items that are not property values
    pub children: Vec<Item>,
    /// Plain value when this item is itself a property value
    pub value: Option<String>,
}

impl Item {
    pub fn has_type(&self, name: &str) -> bool {
        self.types.iter().any(|t| t == name)
    }

    pub fn values(&self, property: &str) -> &[PropertyValue] {
        self.properties.get(property).map_or(&[], Vec::as_slice)
    }

    /// First plain-text value of a property, skipping nested items
    pub fn first_text(&self, property: &str) -> Option<&str> {
        self.values(property).iter().find_map(|v| match v {
            PropertyValue::Text(s) => Some(s.as_str()),
            PropertyValue::Node(_) => None,
        })
    }

    /// Nested items under a property, skipping plain values
    pub fn nodes<'a>(&'a self, property: &str) -> impl Iterator<Item = &'a Item> + 'a {
        self.values(property).iter().filter_map(|v| match v {
            PropertyValue::Node(item) => Some(item.as_ref()),
            PropertyValue::Text(_) => None,
        })
    }

    fn push(&mut self, property: &str, value: PropertyValue) {
        self.properties
            .entry(property.to_string())
            .or_default()
            .push(value);
    }
}

/// A parsed document: top-level items plus document-wide rel links
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub items: Vec<Item>,
    /// rel value -> resolved URLs in document order
    pub rels: HashMap<String, Vec<String>>,
}

impl Document {
    /// First URL declared with the given rel
    pub fn first_rel(&self, rel: &str) -> Option<&str> {
        self.rels.get(rel).and_then(|urls| urls.first()).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prefix {
    P,
    U,
    Dt,
    E,
}

/// An item under construction, tracking which kinds of properties it holds
#[derive(Default)]
struct Builder {
    item: Item,
    has_text_props: bool,
    has_url_props: bool,
}

/// Parse `html`, resolving relative URLs against `base_url`
pub fn parse(html: &str, base_url: &str) -> Document {
    let parser = Parser {
        base: Url::parse(base_url).ok(),
    };
    let document = Html::parse_document(html);

    let mut items = Vec::new();
    let root = document.root_element();
    if root_classes(root).is_empty() {
        parser.collect_items(root, &mut items);
    } else {
        items.push(parser.parse_item(root));
    }

    Document {
        items,
        rels: parser.parse_rels(&document),
    }
}

struct Parser {
    base: Option<Url>,
}

impl Parser {
    /// Find top-level items below `element`
    fn collect_items(&self, element: ElementRef, items: &mut Vec<Item>) {
        for child in element.children().filter_map(ElementRef::wrap) {
            if root_classes(child).is_empty() {
                self.collect_items(child, items);
            } else {
                items.push(self.parse_item(child));
            }
        }
    }

    fn parse_item(&self, element: ElementRef) -> Item {
        let mut builder = Builder {
            item: Item {
                types: root_classes(element),
                ..Default::default()
            },
            ..Default::default()
        };

        self.parse_children(element, &mut builder);
        self.apply_implied(element, &mut builder);
        builder.item
    }

    fn parse_children(&self, element: ElementRef, builder: &mut Builder) {
        for child in element.children().filter_map(ElementRef::wrap) {
            let properties = property_classes(child);

            if !root_classes(child).is_empty() {
                let nested = self.parse_item(child);
                if properties.is_empty() {
                    builder.item.children.push(nested);
                    continue;
                }
                for (prefix, name) in &properties {
                    builder.note(*prefix);
                    let mut node = nested.clone();
                    node.value = Some(self.nested_value(*prefix, child, &nested));
                    builder.item.push(name, PropertyValue::Node(Box::new(node)));
                }
                continue;
            }

            for (prefix, name) in &properties {
                builder.note(*prefix);
                let value = self.property_value(*prefix, child);
                builder.item.push(name, PropertyValue::Text(value));
            }
            self.parse_children(child, builder);
        }
    }

    fn property_value(&self, prefix: Prefix, element: ElementRef) -> String {
        let el = element.value();
        match prefix {
            Prefix::P => text_value(element),
            Prefix::U => {
                let reference = match el.name() {
                    "a" | "area" | "link" => el.attr("href"),
                    "img" | "audio" | "video" | "source" | "iframe" => el.attr("src"),
                    "object" => el.attr("data"),
                    _ => None,
                };
                match reference {
                    Some(r) => self.resolve(r),
                    None => text_value(element),
                }
            }
            Prefix::Dt => match el.name() {
                "time" | "ins" | "del" => el
                    .attr("datetime")
                    .map(|d| d.trim().to_string())
                    .unwrap_or_else(|| text_value(element)),
                _ => text_value(element),
            },
            Prefix::E => element.inner_html().trim().to_string(),
        }
    }

    fn nested_value(&self, prefix: Prefix, element: ElementRef, nested: &Item) -> String {
        let preferred = match prefix {
            Prefix::P => nested.first_text("name"),
            Prefix::U => nested.first_text("url"),
            Prefix::Dt | Prefix::E => None,
        };
        match preferred {
            Some(v) => v.to_string(),
            None if prefix == Prefix::U => self.property_value(prefix, element),
            None => text_content(element),
        }
    }

    fn apply_implied(&self, element: ElementRef, builder: &mut Builder) {
        let el = element.value();
        let has_nested = !builder.item.children.is_empty()
            || builder
                .item
                .properties
                .values()
                .flatten()
                .any(|v| matches!(v, PropertyValue::Node(_)));

        if !builder.item.properties.contains_key("name") && !builder.has_text_props && !has_nested {
            let name = match el.name() {
                "img" | "area" => el.attr("alt").map(|a| a.trim().to_string()),
                "abbr" => el.attr("title").map(|t| t.trim().to_string()),
                _ => None,
            }
            .unwrap_or_else(|| text_content(element));
            builder.item.push("name", PropertyValue::Text(name));
        }

        if builder.has_url_props {
            return;
        }

        if !builder.item.properties.contains_key("photo") {
            let photo = match el.name() {
                "img" => el.attr("src"),
                "object" => el.attr("data"),
                _ => only_child(element, &["img"]).and_then(|c| c.value().attr("src")),
            };
            if let Some(src) = photo {
                let resolved = self.resolve(src);
                builder.item.push("photo", PropertyValue::Text(resolved));
            }
        }

        if !builder.item.properties.contains_key("url") {
            let url = match el.name() {
                "a" | "area" => el.attr("href"),
                _ => only_child(element, &["a", "area"]).and_then(|c| c.value().attr("href")),
            };
            if let Some(href) = url {
                let resolved = self.resolve(href);
                builder.item.push("url", PropertyValue::Text(resolved));
            }
        }
    }

    fn parse_rels(&self, document: &Html) -> HashMap<String, Vec<String>> {
        let mut rels: HashMap<String, Vec<String>> = HashMap::new();

        for element in document.select(&REL_SELECTOR) {
            let el = element.value();
            let (Some(rel), Some(href)) = (el.attr("rel"), el.attr("href")) else {
                continue;
            };
            let url = self.resolve(href);
            for name in rel.split_whitespace() {
                let urls = rels.entry(name.to_ascii_lowercase()).or_default();
                if !urls.contains(&url) {
                    urls.push(url.clone());
                }
            }
        }

        rels
    }

    fn resolve(&self, reference: &str) -> String {
        let reference = reference.trim();
        self.base
            .as_ref()
            .and_then(|base| base.join(reference).ok())
            .map(|u| u.to_string())
            .unwrap_or_else(|| reference.to_string())
    }
}

impl Builder {
    fn note(&mut self, prefix: Prefix) {
        match prefix {
            Prefix::P | Prefix::E => self.has_text_props = true,
            Prefix::U => self.has_url_props = true,
            Prefix::Dt => {}
        }
    }
}

fn is_mf_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn root_classes(element: ElementRef) -> Vec<String> {
    let mut roots: Vec<String> = Vec::new();
    for class in element.value().classes() {
        if class.strip_prefix("h-").is_some_and(is_mf_name) && !roots.iter().any(|r| r == class) {
            roots.push(class.to_string());
        }
    }
    roots
}

fn property_classes(element: ElementRef) -> Vec<(Prefix, String)> {
    element
        .value()
        .classes()
        .filter_map(|class| {
            let (prefix, name) = if let Some(n) = class.strip_prefix("p-") {
                (Prefix::P, n)
            } else if let Some(n) = class.strip_prefix("u-") {
                (Prefix::U, n)
            } else if let Some(n) = class.strip_prefix("dt-") {
                (Prefix::Dt, n)
            } else if let Some(n) = class.strip_prefix("e-") {
                (Prefix::E, n)
            } else {
                return None;
            };
            is_mf_name(name).then(|| (prefix, name.to_string()))
        })
        .collect()
}

/// `p-*` value rules shared by the other prefixes as a fallback
fn text_value(element: ElementRef) -> String {
    let el = element.value();
    let attr = match el.name() {
        "abbr" | "link" => el.attr("title"),
        "data" | "input" => el.attr("value"),
        "img" | "area" => el.attr("alt"),
        _ => None,
    };
    attr.map(|a| a.trim().to_string())
        .unwrap_or_else(|| text_content(element))
}

/// Text of `element`, excluding script and style subtrees, whitespace collapsed
fn text_content(element: ElementRef) -> String {
    let mut parts = Vec::new();

    for node in element.descendants() {
        if let Node::Text(text) = node.value() {
            let excluded = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| matches!(el.name(), "script" | "style"))
            });
            if !excluded {
                parts.push(&**text);
            }
        }
    }

    parts.concat().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The single child element named one of `names`, if it is the only such child
fn only_child<'a>(element: ElementRef<'a>, names: &[&str]) -> Option<ElementRef<'a>> {
    let mut matching = element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|c| names.contains(&c.value().name()));
    let first = matching.next()?;
    matching.next().is_none().then_some(first)
}
