//! `$ref` and `allOf` elimination.
use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::Value;

use super::{Schema, SchemaGraph, document_id};
use crate::error::ResolveError;

/// Which document a node was read from; local references resolve against it.
#[derive(Debug, Clone, Copy)]
enum Doc<'a> {
    Root,
    External(&'a str),
}

struct RefResolver<'a> {
    root_id: Option<String>,
    root_source: &'a Value,
    externals: &'a IndexMap<String, Value>,
    definitions: HashSet<String>,
    /// `document#pointer` keys currently being inlined.
    stack: Vec<String>,
}

struct Merger {
    done: HashSet<String>,
    stack: Vec<String>,
}

impl SchemaGraph {
    pub fn resolve_refs(&mut self) -> Result<(), ResolveError> {
        let mut resolver = RefResolver {
            root_id: self.root.id.as_deref().map(document_id),
            root_source: &self.source,
            externals: &self.externals,
            definitions: self.definition_names().map(str::to_string).collect(),
            stack: Vec::new(),
        };
        resolver.resolve(&mut self.root, Doc::Root, "#")?;
        check_alias_cycles(&self.root)?;
        tracing::debug!(definitions = resolver.definitions.len(), "references resolved");
        Ok(())
    }

    pub fn resolve_all_ofs(&mut self) -> Result<(), ResolveError> {
        let mut defs = self.root.definitions.take().unwrap_or_default();
        let mut merger = Merger { done: HashSet::new(), stack: Vec::new() };
        let result = merger.run(&mut self.root, &mut defs);
        self.root.definitions = Some(defs).filter(|defs| !defs.is_empty());
        result?;
        tracing::debug!(merged = merger.done.len(), "allOf lists merged");
        Ok(())
    }
}

impl<'a> RefResolver<'a> {
    fn resolve(&mut self, node: &mut Schema, doc: Doc<'a>, path: &str) -> Result<(), ResolveError> {
        if let Some(reference) = node.reference.take() {
            return self.follow(node, doc, path, reference);
        }
        node.try_for_each_child(path, |child, child_path| self.resolve(child, doc, &child_path))
    }

    fn follow(
        &mut self,
        node: &mut Schema,
        doc: Doc<'a>,
        path: &str,
        reference: String,
    ) -> Result<(), ResolveError> {
        let (doc_part, pointer) = match reference.split_once('#') {
            Some((doc_part, pointer)) => (doc_part, pointer),
            None => (reference.as_str(), ""),
        };
        let externals = self.externals;
        let target_doc = if doc_part.is_empty() {
            doc
        } else if self.root_id.as_deref() == Some(doc_part) {
            Doc::Root
        } else if let Some((id, _)) = externals.get_key_value(doc_part) {
            Doc::External(id.as_str())
        } else {
            return Err(unresolvable(path, &reference));
        };

        if let (Doc::Root, Some(name)) = (target_doc, definition_name(pointer)) {
            if !self.definitions.contains(&name) {
                return Err(unresolvable(path, &reference));
            }
            *node = Schema {
                link: Some(name),
                description: node.description.take(),
                ..Schema::default()
            };
            return Ok(());
        }

        let (doc_key, source) = match target_doc {
            Doc::Root => (self.root_id.clone().unwrap_or_default(), self.root_source),
            Doc::External(id) => (id.to_string(), &externals[id]),
        };
        let key = format!("{doc_key}#{pointer}");
        if let Some(start) = self.stack.iter().position(|k| *k == key) {
            let mut chain = self.stack[start..].to_vec();
            chain.push(key);
            return Err(ResolveError::CyclicReference { chain });
        }
        let target = source
            .pointer(pointer)
            .ok_or_else(|| unresolvable(path, &reference))?;
        let mut inlined = Schema::from_value(target.clone()).map_err(|err| ResolveError::NotASchema {
            path: path.to_string(),
            reference: reference.clone(),
            detail: err.to_string(),
        })?;
        tracing::trace!(%path, %reference, "inlining reference");

        self.stack.push(key);
        let result = self.resolve(&mut inlined, target_doc, path);
        self.stack.pop();
        result?;

        *node = inlined;
        Ok(())
    }
}

impl Merger {
    fn run(&mut self, root: &mut Schema, defs: &mut IndexMap<String, Schema>) -> Result<(), ResolveError> {
        let names: Vec<String> = defs.keys().cloned().collect();
        for name in &names {
            self.definition(defs, name)?;
        }
        self.flatten(root, defs, "#")
    }

    fn definition(&mut self, defs: &mut IndexMap<String, Schema>, name: &str) -> Result<(), ResolveError> {
        if self.done.contains(name) {
            return Ok(());
        }
        if let Some(start) = self.stack.iter().position(|n| n == name) {
            let mut chain = self.stack[start..].to_vec();
            chain.push(name.to_string());
            return Err(ResolveError::CyclicMerge { chain });
        }
        let Some(mut schema) = defs.get(name).cloned() else {
            return Ok(());
        };
        self.stack.push(name.to_string());
        let result = self.flatten(&mut schema, defs, &format!("#/definitions/{name}"));
        self.stack.pop();
        result?;
        defs.insert(name.to_string(), schema);
        self.done.insert(name.to_string());
        Ok(())
    }

    fn flatten(
        &mut self,
        node: &mut Schema,
        defs: &mut IndexMap<String, Schema>,
        path: &str,
    ) -> Result<(), ResolveError> {
        let members = node.all_of.take();
        node.try_for_each_child(path, |child, child_path| self.flatten(child, defs, &child_path))?;
        let Some(members) = members else {
            return Ok(());
        };

        let mut merged = std::mem::take(node);
        for (i, mut member) in members.into_iter().enumerate() {
            self.flatten(&mut member, defs, &format!("{path}/allOf/{i}"))?;
            while let Some(name) = member.link.clone() {
                self.definition(defs, &name)?;
                member = defs.get(&name).cloned().unwrap_or_default();
            }
            merged.absorb(member);
        }
        *node = merged;
        Ok(())
    }
}

/// `/definitions/<name>` -> `name` (JSON-pointer unescaped).
fn definition_name(pointer: &str) -> Option<String> {
    let name = pointer.strip_prefix("/definitions/")?;
    if name.is_empty() || name.contains('/') {
        return None;
    }
    Some(name.replace("~1", "/").replace("~0", "~"))
}

fn unresolvable(path: &str, reference: &str) -> ResolveError {
    ResolveError::Unresolvable { path: path.to_string(), reference: reference.to_string() }
}

/// Definitions that only alias other definitions must not loop.
fn check_alias_cycles(root: &Schema) -> Result<(), ResolveError> {
    let Some(defs) = &root.definitions else {
        return Ok(());
    };
    for start in defs.keys() {
        let mut chain = vec![start.clone()];
        let mut current = start;
        while let Some(next) = defs.get(current).and_then(|s| s.link.as_ref()) {
            if chain.contains(next) {
                chain.push(next.clone());
                return Err(ResolveError::CyclicReference { chain });
            }
            chain.push(next.clone());
            current = next;
        }
    }
    Ok(())
}
