// Route resolver
// Turns a (from, to) pair into a concrete edge sequence using the major
// route table and the minor edges. Pure: reads one snapshot, mutates nothing.
//
// Numan Thabit 2025 Nov

use crate::errors::{ResolutionError, RouteCase};
use crate::router::routes::{AssetId, Route};
use crate::router::tables::RoutingTables;

pub fn route_case(tables: &RoutingTables, from: AssetId, to: AssetId) -> RouteCase {
    match (tables.is_major(from), tables.is_major(to)) {
        (true, true) => RouteCase::MajorToMajor,
        (false, true) => RouteCase::MinorToMajor,
        (true, false) => RouteCase::MajorToMinor,
        (false, false) => RouteCase::MinorToMinor,
    }
}

pub fn resolve(tables: &RoutingTables, from: AssetId, to: AssetId) -> Result<Route, ResolutionError> {
    let case = route_case(tables, from, to);
    let no_major = ResolutionError::NoPathFromMajorAsset { case };
    let no_input = ResolutionError::NoPathFromInputAsset { case };

    match case {
        RouteCase::MajorToMajor => tables.major_route(from, to).cloned().ok_or(no_major),
        RouteCase::MinorToMajor => {
            let edge = *tables.minor_edge(from).ok_or(no_input)?;
            if edge.to == to {
                return Ok(vec![edge]);
            }
            let tail = tables.major_route(edge.to, to).ok_or(no_major)?;
            let mut route = Vec::with_capacity(tail.len() + 1);
            route.push(edge);
            route.extend_from_slice(tail);
            Ok(route)
        }
        RouteCase::MajorToMinor => {
            // the missing lookup is the output side's edge; it keeps the input wording
            let edge = tables.minor_edge(to).ok_or(no_input)?.reversed();
            if edge.from == from {
                return Ok(vec![edge]);
            }
            let head = tables.major_route(from, edge.from).ok_or(no_major)?;
            let mut route = Vec::with_capacity(head.len() + 1);
            route.extend_from_slice(head);
            route.push(edge);
            Ok(route)
        }
        RouteCase::MinorToMinor => {
            let first = *tables.minor_edge(from).ok_or(no_input)?;
            let last = tables
                .minor_edge(to)
                .ok_or(ResolutionError::NoPathFromOutputAsset { case })?
                .reversed();
            if first.to == last.from {
                return Ok(vec![first, last]);
            }
            let middle = tables.major_route(first.to, last.from).ok_or(no_major)?;
            let mut route = Vec::with_capacity(middle.len() + 2);
            route.push(first);
            route.extend_from_slice(middle);
            route.push(last);
            Ok(route)
        }
    }
}
