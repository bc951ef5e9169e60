//! Grouping of TMS job records into routes.

use std::collections::HashMap;

use routesync_domain::{JobRecord, Route};

/// Partition jobs by `RouteId`.
///
/// Routes appear in the order their id is first seen, and each route keeps
/// its jobs in input order. Every job lands in exactly one route and no two
/// routes share an id. An empty input yields an empty output.
pub fn group<I>(jobs: I) -> Vec<Route>
where
    I: IntoIterator<Item = JobRecord>,
{
    let mut routes: Vec<Route> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for job in jobs {
        match positions.get(&job.route_id) {
            Some(&idx) => routes[idx].jobs.push(job),
            None => {
                positions.insert(job.route_id.clone(), routes.len());
                routes.push(Route { route_id: job.route_id.clone(), jobs: vec![job] });
            }
        }
    }

    routes
}
