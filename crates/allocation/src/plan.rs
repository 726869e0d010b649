use std::collections::VecDeque;

/// Part of one request placed on one flowcell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment {
    /// Index of the request in the group's allocation order
    pub origin: usize,
    pub lanes: u32,
    /// The first fragment of a request keeps the request's identity
    pub carries_identity: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlannedFlowcell {
    pub fragments: Vec<Fragment>,
}

impl PlannedFlowcell {
    pub fn lanes(&self) -> u32 {
        self.fragments.iter().map(|f| f.lanes).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanePlan {
    pub flowcells: Vec<PlannedFlowcell>,
    /// Fragments of the trailing flowcell that was not filled and not kept
    pub leftover: Vec<Fragment>,
}

/// Packs `requests` (lane counts, already in allocation order) onto
/// flowcells of `capacity` lanes.
///
/// A request that does not fit the running flowcell takes what is free and
/// the rest starts the next flowcell. The last flowcell is kept when it is
/// partly filled only if `keep_partial` is set.
pub fn plan_lanes(requests: &[u32], capacity: u32, keep_partial: bool) -> LanePlan {
    let mut plan = LanePlan::default();
    if capacity == 0 {
        return plan;
    }

    let mut queue: VecDeque<Fragment> = requests
        .iter()
        .enumerate()
        .filter(|&(_, &lanes)| lanes > 0)
        .map(|(origin, &lanes)| Fragment {
            origin,
            lanes,
            carries_identity: true,
        })
        .collect();

    let mut current = PlannedFlowcell::default();
    let mut free = capacity;
    while let Some(next) = queue.pop_front() {
        let take = next.lanes.min(free);
        current.fragments.push(Fragment {
            lanes: take,
            ..next
        });
        if next.lanes > take {
            queue.push_front(Fragment {
                origin: next.origin,
                lanes: next.lanes - take,
                carries_identity: false,
            });
        }
        free -= take;
        if free == 0 {
            plan.flowcells.push(std::mem::take(&mut current));
            free = capacity;
        }
    }

    if !current.fragments.is_empty() {
        if keep_partial {
            plan.flowcells.push(current);
        } else {
            plan.leftover = current.fragments;
        }
    }
    plan
}
