// Pre-commit validation module
// Validates edges, routes, LP entries and parallel batch arguments before
// any routing table is touched
//
// Numan Thabit 2025 Nov

use crate::errors::ValidationError;
use crate::router::routes::{Edge, LpEntry};

pub fn validate_edge(edge: &Edge) -> Result<(), ValidationError> {
    if !edge.protocol.is_set() {
        return Err(ValidationError::ProtocolUnset);
    }
    if edge.is_loop() {
        return Err(ValidationError::EdgeIsLoop);
    }
    Ok(())
}

/// Edges are checked one at a time (protocol, self-loop, then the link to
/// the previous edge); the endpoint loop check runs once every edge passed.
pub fn validate_route(route: &[Edge]) -> Result<(), ValidationError> {
    let (first, last) = match (route.first(), route.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(ValidationError::EmptyRoute),
    };

    let mut previous: Option<&Edge> = None;
    for edge in route {
        validate_edge(edge)?;
        if let Some(prev) = previous {
            if prev.to != edge.from {
                return Err(ValidationError::RouteBroken);
            }
        }
        previous = Some(edge);
    }

    if first.from == last.to {
        return Err(ValidationError::RouteIsLoop);
    }
    Ok(())
}

pub fn validate_lp_entry(entry: &LpEntry) -> Result<(), ValidationError> {
    if !entry.protocol.is_set() {
        return Err(ValidationError::ProtocolUnset);
    }
    if entry.underlying.is_empty() {
        return Err(ValidationError::EmptyUnderlying);
    }
    Ok(())
}

pub fn ensure_same_len(left: usize, right: usize) -> Result<(), ValidationError> {
    if left != right {
        return Err(ValidationError::LengthDiscrepancy);
    }
    Ok(())
}
