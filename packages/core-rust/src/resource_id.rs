//! Parsed, immutable ARM and UCP resource identifiers.
//!
//! A resource ID is split into three parts:
//!
//! - **scope segments** (`type/name` pairs before the first `providers`), e.g.
//!   `subscriptions/{id}` or `radius/local` under a `/planes` prefix
//! - **type segments**, starting with `Namespace/type` after `providers`
//!   and continuing with child types
//! - **extension segments**, after a second `providers`
//!
//! A trailing type (or scope) without a name denotes a collection.

use std::fmt;

/// Separator between resource ID segments.
pub const SEGMENT_SEPARATOR: char = '/';

const PLANES_SEGMENT: &str = "planes";
const PROVIDERS_SEGMENT: &str = "providers";
const RESOURCE_GROUPS_SEGMENT: &str = "resourcegroups";
const SUBSCRIPTIONS_SEGMENT: &str = "subscriptions";

/// Errors produced while parsing a resource ID.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceIdError {
    #[error("'{id}' is not a valid resource id: {reason}")]
    Invalid { id: String, reason: &'static str },
    #[error("'{0}' is a valid resource id but does not refer to a resource")]
    NotAResource(String),
    #[error("'{0}' is a valid resource id but does not refer to a scope")]
    NotAScope(String),
}

impl ResourceIdError {
    fn invalid(id: &str, reason: &'static str) -> Self {
        Self::Invalid {
            id: id.to_string(),
            reason,
        }
    }
}

/// A single `type/name` pair in the scope portion of an ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeSegment {
    pub segment_type: String,
    /// Empty when the segment is a trailing collection.
    pub name: String,
}

impl ScopeSegment {
    #[must_use]
    pub fn new(segment_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            segment_type: segment_type.into(),
            name: name.into(),
        }
    }
}

/// A single `type/name` pair in the resource-type portion of an ID.
///
/// The first type segment of a resource carries the provider namespace,
/// e.g. `Applications.Core/containers`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeSegment {
    pub segment_type: String,
    /// Empty when the segment is a trailing collection.
    pub name: String,
}

impl TypeSegment {
    #[must_use]
    pub fn new(segment_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            segment_type: segment_type.into(),
            name: name.into(),
        }
    }
}

/// A parsed resource identifier. Construct with [`ResourceId::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ResourceId {
    id: String,
    ucp_qualified: bool,
    scope_segments: Vec<ScopeSegment>,
    type_segments: Vec<TypeSegment>,
    extension_segments: Vec<TypeSegment>,
}

impl ResourceId {
    /// Parses a resource, scope, or collection ID.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceIdError::Invalid`] when the ID does not start with a
    /// single `/`, contains empty segments, or ends with `providers`.
    pub fn parse(id: &str) -> Result<Self, ResourceIdError> {
        if !id.starts_with(SEGMENT_SEPARATOR) {
            return Err(ResourceIdError::invalid(id, "id must start with '/'"));
        }
        if id.starts_with("//") {
            return Err(ResourceIdError::invalid(id, "id must not start with '//'"));
        }

        let trimmed = id.trim_start_matches(SEGMENT_SEPARATOR);
        let trimmed = trimmed.strip_suffix(SEGMENT_SEPARATOR).unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Ok(Self {
                id: SEGMENT_SEPARATOR.to_string(),
                ..Self::default()
            });
        }

        let mut segments: Vec<&str> = trimmed.split(SEGMENT_SEPARATOR).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ResourceIdError::invalid(id, "id contains an empty segment"));
        }

        let ucp_qualified = segments[0].eq_ignore_ascii_case(PLANES_SEGMENT);
        if ucp_qualified {
            segments.remove(0);
            if segments.is_empty() {
                return Err(ResourceIdError::invalid(id, "'planes' must be followed by a plane type"));
            }
        }

        let mut scopes = Vec::new();
        let mut i = 0;
        while i < segments.len() && !segments[i].eq_ignore_ascii_case(PROVIDERS_SEGMENT) {
            let name = segments.get(i + 1).copied().unwrap_or_default();
            if name.eq_ignore_ascii_case(PROVIDERS_SEGMENT) {
                return Err(ResourceIdError::invalid(id, "scope segment is missing a name"));
            }
            scopes.push(ScopeSegment::new(segments[i], name));
            i += 2;
        }

        let mut types = Vec::new();
        let mut extensions = Vec::new();
        if i < segments.len() {
            i = parse_provider_segments(id, &segments, i, &mut types)?;
            if i < segments.len() {
                i = parse_provider_segments(id, &segments, i, &mut extensions)?;
            }
            if i < segments.len() {
                return Err(ResourceIdError::invalid(id, "too many 'providers' segments"));
            }
        }

        Ok(Self::from_parts(ucp_qualified, scopes, types, extensions))
    }

    /// Parses an ID that must refer to a resource (not a scope or collection).
    ///
    /// # Errors
    ///
    /// Returns [`ResourceIdError::NotAResource`] for scope or collection IDs.
    pub fn parse_resource(id: &str) -> Result<Self, ResourceIdError> {
        let parsed = Self::parse(id)?;
        if parsed.is_resource() {
            Ok(parsed)
        } else {
            Err(ResourceIdError::NotAResource(id.to_string()))
        }
    }

    /// Parses an ID that must refer to a scope.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceIdError::NotAScope`] for resource or collection IDs.
    pub fn parse_scope(id: &str) -> Result<Self, ResourceIdError> {
        let parsed = Self::parse(id)?;
        if parsed.is_scope() {
            Ok(parsed)
        } else {
            Err(ResourceIdError::NotAScope(id.to_string()))
        }
    }

    /// Parses an ID taken from a request path. POST requests address a
    /// custom action below the resource, so the trailing action segment is
    /// truncated.
    ///
    /// # Errors
    ///
    /// Same as [`ResourceId::parse`].
    pub fn parse_by_method(id: &str, method: &str) -> Result<Self, ResourceIdError> {
        let parsed = Self::parse(id)?;
        if method.eq_ignore_ascii_case("POST") {
            Ok(parsed.truncate())
        } else {
            Ok(parsed)
        }
    }

    /// Builds an ID from its parts, normalizing the string form.
    #[must_use]
    pub fn from_parts(
        ucp_qualified: bool,
        scope_segments: Vec<ScopeSegment>,
        type_segments: Vec<TypeSegment>,
        extension_segments: Vec<TypeSegment>,
    ) -> Self {
        let id = make_id(ucp_qualified, &scope_segments, &type_segments, &extension_segments);
        Self {
            id,
            ucp_qualified,
            scope_segments,
            type_segments,
            extension_segments,
        }
    }

    /// The normalized string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scope_segments.is_empty()
            && self.type_segments.is_empty()
            && self.extension_segments.is_empty()
    }

    /// True when the ID has a `/planes` prefix.
    #[must_use]
    pub fn is_ucp_qualified(&self) -> bool {
        self.ucp_qualified
    }

    /// True for a named scope with no resource types, e.g. a resource group.
    #[must_use]
    pub fn is_scope(&self) -> bool {
        self.type_segments.is_empty()
            && self.extension_segments.is_empty()
            && self.scope_segments.last().is_some_and(|s| !s.name.is_empty())
    }

    /// True for an ID whose final type segment carries a name.
    #[must_use]
    pub fn is_resource(&self) -> bool {
        if self.scope_segments.iter().any(|s| s.name.is_empty()) {
            return false;
        }
        self.last_type_segment().is_some_and(|t| !t.name.is_empty())
    }

    /// True for an ID ending with an unnamed scope type, e.g. `/subscriptions`.
    #[must_use]
    pub fn is_scope_collection(&self) -> bool {
        self.type_segments.is_empty()
            && self.extension_segments.is_empty()
            && self.scope_segments.last().is_some_and(|s| s.name.is_empty())
    }

    /// True for an ID ending with an unnamed resource type.
    #[must_use]
    pub fn is_resource_collection(&self) -> bool {
        self.last_type_segment().is_some_and(|t| t.name.is_empty())
    }

    #[must_use]
    pub fn is_extension_resource(&self) -> bool {
        !self.extension_segments.is_empty()
    }

    #[must_use]
    pub fn scope_segments(&self) -> &[ScopeSegment] {
        &self.scope_segments
    }

    #[must_use]
    pub fn type_segments(&self) -> &[TypeSegment] {
        &self.type_segments
    }

    #[must_use]
    pub fn extension_segments(&self) -> &[TypeSegment] {
        &self.extension_segments
    }

    /// Finds the name of the scope segment with the given type (case-insensitive).
    #[must_use]
    pub fn find_scope(&self, scope_type: &str) -> Option<&str> {
        self.scope_segments
            .iter()
            .find(|s| s.segment_type.eq_ignore_ascii_case(scope_type))
            .map(|s| s.name.as_str())
    }

    /// The scope portion of the ID, e.g. `/planes/radius/local/resourceGroups/rg`.
    #[must_use]
    pub fn root_scope(&self) -> String {
        make_id(self.ucp_qualified, &self.scope_segments, &[], &[])
    }

    /// The scope portion with the resource group removed, e.g.
    /// `/planes/radius/local` or `/subscriptions/{id}`.
    #[must_use]
    pub fn plane_scope(&self) -> String {
        let scopes: Vec<ScopeSegment> = self
            .scope_segments
            .iter()
            .take_while(|s| !s.segment_type.eq_ignore_ascii_case(RESOURCE_GROUPS_SEGMENT))
            .cloned()
            .collect();
        make_id(self.ucp_qualified, &scopes, &[], &[])
    }

    /// The ID without its scope, e.g. `/providers/Applications.Core/containers/c1`.
    #[must_use]
    pub fn routing_scope(&self) -> String {
        make_id(false, &[], &self.type_segments, &self.extension_segments)
    }

    /// Provider namespace of the addressed resource type, e.g. `Applications.Core`.
    #[must_use]
    pub fn provider_namespace(&self) -> &str {
        self.effective_type_segments()
            .first()
            .and_then(|t| t.segment_type.split(SEGMENT_SEPARATOR).next())
            .unwrap_or_default()
    }

    /// Fully-qualified resource type, e.g. `Applications.Core/containers`.
    ///
    /// Child types are appended with `/`. For extension resources only the
    /// extension types are returned.
    #[must_use]
    pub fn resource_type(&self) -> String {
        self.effective_type_segments()
            .iter()
            .map(|t| t.segment_type.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Resource name. Nested resources join their names with `/`.
    #[must_use]
    pub fn name(&self) -> String {
        let segments = self.effective_type_segments();
        if segments.is_empty() {
            return self
                .scope_segments
                .last()
                .map(|s| s.name.clone())
                .unwrap_or_default();
        }
        segments
            .iter()
            .map(|t| t.name.as_str())
            .filter(|n| !n.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Removes the last type segment (or the last scope segment of a scope ID).
    #[must_use]
    pub fn truncate(&self) -> Self {
        let mut scopes = self.scope_segments.clone();
        let mut types = self.type_segments.clone();
        let mut extensions = self.extension_segments.clone();

        if !extensions.is_empty() {
            extensions.pop();
        } else if !types.is_empty() {
            types.pop();
        } else {
            scopes.pop();
        }

        Self::from_parts(self.ucp_qualified, scopes, types, extensions)
    }

    /// Appends a type segment to the resource (or extension) types.
    #[must_use]
    pub fn append(&self, segment: TypeSegment) -> Self {
        let mut types = self.type_segments.clone();
        let mut extensions = self.extension_segments.clone();
        if extensions.is_empty() {
            types.push(segment);
        } else {
            extensions.push(segment);
        }
        Self::from_parts(self.ucp_qualified, self.scope_segments.clone(), types, extensions)
    }

    fn effective_type_segments(&self) -> &[TypeSegment] {
        if self.extension_segments.is_empty() {
            &self.type_segments
        } else {
            &self.extension_segments
        }
    }

    fn last_type_segment(&self) -> Option<&TypeSegment> {
        self.effective_type_segments().last()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl std::str::FromStr for ResourceId {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Returns the index where the resource ID starts inside a request path:
/// the first `/planes/` or `/subscriptions/` (case-insensitive), or 0.
#[must_use]
pub fn base_index(path: &str) -> usize {
    let normalized = path.to_ascii_lowercase();
    [PLANES_SEGMENT, SUBSCRIPTIONS_SEGMENT]
        .iter()
        .filter_map(|segment| normalized.find(&format!("/{segment}/")))
        .min()
        .unwrap_or(0)
}

/// The path prefix in front of the resource ID, e.g. `/apis/api.ucp.dev/v1alpha3`.
#[must_use]
pub fn parse_path_base(path: &str) -> &str {
    &path[..base_index(path)]
}

fn parse_provider_segments(
    id: &str,
    segments: &[&str],
    start: usize,
    out: &mut Vec<TypeSegment>,
) -> Result<usize, ResourceIdError> {
    // segments[start] is "providers"
    let mut i = start + 1;
    let Some(namespace) = segments.get(i) else {
        return Err(ResourceIdError::invalid(id, "'providers' must be followed by a namespace"));
    };
    i += 1;
    let Some(first_type) = segments.get(i) else {
        return Err(ResourceIdError::invalid(id, "namespace must be followed by a resource type"));
    };
    let name = segments.get(i + 1).copied().unwrap_or_default();
    out.push(TypeSegment::new(format!("{namespace}/{first_type}"), name));
    i += 2;

    while i < segments.len() && !segments[i].eq_ignore_ascii_case(PROVIDERS_SEGMENT) {
        let name = segments.get(i + 1).copied().unwrap_or_default();
        out.push(TypeSegment::new(segments[i], name));
        i += 2;
    }

    if i < segments.len() && out.last().is_some_and(|t| t.name.is_empty()) {
        return Err(ResourceIdError::invalid(id, "collection must be the last segment"));
    }
    Ok(i)
}

fn make_id(
    ucp_qualified: bool,
    scopes: &[ScopeSegment],
    types: &[TypeSegment],
    extensions: &[TypeSegment],
) -> String {
    let mut id = String::new();
    if ucp_qualified {
        id.push_str("/planes");
    }
    for scope in scopes {
        push_pair(&mut id, &scope.segment_type, &scope.name);
    }
    for group in [types, extensions] {
        if group.is_empty() {
            continue;
        }
        id.push_str("/providers");
        for segment in group {
            push_pair(&mut id, &segment.segment_type, &segment.name);
        }
    }
    if id.is_empty() {
        id.push(SEGMENT_SEPARATOR);
    }
    id
}

fn push_pair(id: &mut String, segment_type: &str, name: &str) {
    id.push(SEGMENT_SEPARATOR);
    id.push_str(segment_type);
    if !name.is_empty() {
        id.push(SEGMENT_SEPARATOR);
        id.push_str(name);
    }
}
