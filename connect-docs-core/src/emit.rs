//! AsciiDoc fragments for each component: a field reference and an examples
//! section.
//!
//! Every [`RenderContext`] owns its own handlebars registry and helper table,
//! so renderers built with different helpers never interfere.

use crate::error::DocsResult;
use crate::identity::{component_groups, name_of};
use crate::model::{Component, Field};
use handlebars::{handlebars_helper, no_escape, Handlebars};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const FIELDS_TEMPLATE: &str = "fields";
const EXAMPLES_TEMPLATE: &str = "examples";

const FIELDS_SOURCE: &str = r#"// This content is autogenerated. Do not edit manually.
{{#each fields}}

=== {{code path}}

{{#if description}}
{{description}}

{{/if}}
*Type*: {{code display_type}}

{{#if has_default}}
*Default*: {{code (default_value default)}}

{{/if}}
{{#if options}}
*Options*: {{join options ", "}}

{{/if}}
{{#if annotated_options}}
|===
| Option | Summary

{{#each annotated_options}}
| {{code name}}
| {{summary}}

{{/each}}
|===

{{/if}}
{{#if version}}
*Requires version*: {{version}}

{{/if}}
*Secret*: {{yes_no is_secret}}
{{/each}}
"#;

const EXAMPLES_SOURCE: &str = r#"// This content is autogenerated. Do not edit manually.
{{#each examples}}

[id="{{lower ../name}}-{{lower (slug title)}}"]
=== {{title}}

{{#if summary}}
{{summary}}

{{/if}}
{{#if config}}
[source,yaml]
----
{{config}}
----
{{/if}}
{{/each}}
"#;

handlebars_helper!(code: |s: str| format!("`{s}`"));
handlebars_helper!(lower: |s: str| s.to_lowercase());
handlebars_helper!(slug: |s: str| slugify(s));
handlebars_helper!(yes_no: |b: bool| if b { "Yes" } else { "No" });
handlebars_helper!(join: |items: array, sep: str| {
    items
        .iter()
        .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
        .collect::<Vec<_>>()
        .join(sep)
});
handlebars_helper!(default_value: |v: Json| render_default(v));

/// Renders a JSON default as it should appear in an AsciiDoc literal.
pub fn render_default(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{s}\""),
        Value::Array(items) if items.is_empty() => "[]".to_string(),
        Value::Object(obj) if obj.is_empty() => "{}".to_string(),
        other => other.to_string(),
    }
}

fn slugify(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Debug, Serialize)]
struct OptionView<'a> {
    name: &'a str,
    summary: &'a str,
}

#[derive(Debug, Serialize)]
struct FieldView<'a> {
    path: String,
    display_type: String,
    description: Option<&'a str>,
    has_default: bool,
    default: Option<&'a Value>,
    options: &'a [String],
    annotated_options: Vec<OptionView<'a>>,
    version: Option<&'a str>,
    is_secret: bool,
}

/// Per-invocation template registry.
pub struct RenderContext<'reg> {
    registry: Handlebars<'reg>,
}

impl<'reg> RenderContext<'reg> {
    pub fn new() -> DocsResult<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(no_escape);
        registry.register_helper("code", Box::new(code));
        registry.register_helper("lower", Box::new(lower));
        registry.register_helper("slug", Box::new(slug));
        registry.register_helper("yes_no", Box::new(yes_no));
        registry.register_helper("join", Box::new(join));
        registry.register_helper("default_value", Box::new(default_value));
        registry.register_template_string(FIELDS_TEMPLATE, FIELDS_SOURCE)?;
        registry.register_template_string(EXAMPLES_TEMPLATE, EXAMPLES_SOURCE)?;
        Ok(Self { registry })
    }

    /// Replaces one of the built-in templates, e.g. with a site-specific layout.
    pub fn override_template(&mut self, name: &str, source: &str) -> DocsResult<()> {
        self.registry.register_template_string(name, source)?;
        Ok(())
    }

    /// Field reference for a component. Nested fields appear with dotted
    /// paths; deprecated fields and their children are left out.
    pub fn render_fields(&self, component: &Component) -> DocsResult<String> {
        let mut fields = Vec::new();
        flatten_fields(component.fields(), "", &mut fields);
        let data = serde_json::json!({ "name": component.name, "fields": fields });
        Ok(self.registry.render(FIELDS_TEMPLATE, &data)?)
    }

    pub fn render_examples(&self, component: &Component) -> DocsResult<String> {
        let data = serde_json::json!({ "name": component.name, "examples": component.examples });
        Ok(self.registry.render(EXAMPLES_TEMPLATE, &data)?)
    }
}

fn flatten_fields<'a>(fields: &'a [Field], prefix: &str, out: &mut Vec<FieldView<'a>>) {
    for field in fields.iter().filter(|f| !f.is_deprecated) {
        let path = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{prefix}.{}", field.name)
        };
        out.push(FieldView {
            path: path.clone(),
            display_type: display_type(field),
            description: field.description.as_deref(),
            has_default: field.default.is_some(),
            default: field.default.as_ref(),
            options: &field.options,
            annotated_options: field
                .annotated_options
                .iter()
                .map(|(name, summary)| OptionView { name, summary })
                .collect(),
            version: field.version.as_deref(),
            is_secret: field.is_secret,
        });
        if field.is_object() {
            flatten_fields(&field.children, &path, out);
        }
    }
}

fn display_type(field: &Field) -> String {
    use crate::model::FieldKind;
    let base = field.field_type.as_deref().unwrap_or("unknown");
    match field.kind {
        FieldKind::Array => format!("array<{base}>"),
        FieldKind::Map => format!("map<{base}>"),
        _ => base.to_string(),
    }
}

/// Writes field and example partials for every named component in `doc`.
/// Returns the written paths.
pub fn emit_component_docs(doc: &Value, out_dir: &Path) -> DocsResult<Vec<PathBuf>> {
    let ctx = RenderContext::new()?;
    let mut written = Vec::new();

    for (component_type, components) in component_groups(doc) {
        for raw in components {
            if name_of(raw).is_none() {
                debug!(component_type = %component_type, "Skipping unnamed component");
                continue;
            }
            let component = Component::from_raw(component_type, raw)?;
            let base = out_dir.join(component_type).join("partials");

            let fields_path = base.join("fields").join(format!("{}.adoc", component.name));
            write_fragment(&fields_path, &ctx.render_fields(&component)?)?;
            written.push(fields_path);

            if !component.examples.is_empty() {
                let examples_path = base.join("examples").join(format!("{}.adoc", component.name));
                write_fragment(&examples_path, &ctx.render_examples(&component)?)?;
                written.push(examples_path);
            }
        }
    }

    info!(count = written.len(), out_dir = %out_dir.display(), "Emitted component doc fragments");
    Ok(written)
}

fn write_fragment(path: &Path, content: &str) -> DocsResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}
