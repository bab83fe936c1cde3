use std::collections::VecDeque;

use glam::DVec2;

/// Ticket for one outstanding path request. Ids are monotonic per oracle so
/// a unit can discard responses to requests it has since superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathRequestId(pub u64);

#[derive(Debug, Clone)]
pub struct PathResponse {
    pub id: PathRequestId,
    /// `None` when no path exists; the requesting unit stays halted.
    pub path: Option<Vec<DVec2>>,
}

/// The external path provider, consumed request/response so the simulation
/// never suspends mid-tick: requests are issued during command handling and
/// responses are drained at the start of a later tick.
pub trait PathOracle {
    /// Opens a batch of related requests sharing a penalty field, so
    /// simultaneous orders spread across alternate routes.
    fn start_group(&mut self, base_cost: u32, cell_spread: u32, max_workers: u32);

    fn end_group(&mut self);

    fn request(&mut self, from: DVec2, to: DVec2) -> PathRequestId;

    /// Takes every response that has arrived since the last drain.
    fn drain_responses(&mut self) -> Vec<PathResponse>;
}

/// Oracle that answers every request with the straight segment to the goal
/// on the next drain. The default for hosts without a pathfinding worker.
#[derive(Debug, Default)]
pub struct DirectPathOracle {
    next_id: u64,
    ready: Vec<PathResponse>,
}

impl DirectPathOracle {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PathOracle for DirectPathOracle {
    fn start_group(&mut self, _base_cost: u32, _cell_spread: u32, _max_workers: u32) {}

    fn end_group(&mut self) {}

    fn request(&mut self, _from: DVec2, to: DVec2) -> PathRequestId {
        let id = PathRequestId(self.next_id);
        self.next_id += 1;
        self.ready.push(PathResponse {
            id,
            path: Some(vec![to]),
        });
        id
    }

    fn drain_responses(&mut self) -> Vec<PathResponse> {
        std::mem::take(&mut self.ready)
    }
}

/// Test oracle with scripted answers. Each request consumes the next queued
/// script entry; `delay_drains` holds responses back for that many drains.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    next_id: u64,
    scripts: VecDeque<Option<Vec<DVec2>>>,
    pending: Vec<(u32, PathResponse)>,
    pub delay_drains: u32,
    pub groups_started: Vec<(u32, u32, u32)>,
    pub groups_ended: u32,
    pub requests: Vec<(DVec2, DVec2)>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&mut self, path: Option<Vec<DVec2>>) {
        self.scripts.push_back(path);
    }
}

impl PathOracle for ScriptedOracle {
    fn start_group(&mut self, base_cost: u32, cell_spread: u32, max_workers: u32) {
        self.groups_started.push((base_cost, cell_spread, max_workers));
    }

    fn end_group(&mut self) {
        self.groups_ended += 1;
    }

    fn request(&mut self, from: DVec2, to: DVec2) -> PathRequestId {
        let id = PathRequestId(self.next_id);
        self.next_id += 1;
        self.requests.push((from, to));

        let path = match self.scripts.pop_front() {
            Some(scripted) => scripted,
            None => Some(vec![to]),
        };
        self.pending.push((self.delay_drains, PathResponse { id, path }));
        id
    }

    fn drain_responses(&mut self) -> Vec<PathResponse> {
        let mut ready = Vec::new();
        self.pending.retain_mut(|(delay, response)| {
            if *delay == 0 {
                ready.push(response.clone());
                false
            } else {
                *delay -= 1;
                true
            }
        });
        ready
    }
}
