use crate::window::EventWindow;
use fct_model::{Batch, BucketEntry, LabEvent, LabEventType, Vessel, VesselRef};
use std::collections::BTreeSet;

/// Everything the builder needs about one loading tube in one batch.
#[derive(Debug, Clone)]
pub struct LoadingTubeAggregate {
    pub vessel: Vessel,
    pub batch: Batch,

    /// Loading events that made the tube, oldest first
    pub events: Vec<LabEvent>,

    /// Bucket entries of `batch` reached through the tube's samples
    pub bucket_entries: Vec<BucketEntry>,

    /// Starting vessels of `batch` that have no bucket entry
    pub controls: Vec<VesselRef>,

    /// Other batches the tube's lineage mentions
    pub additional_batches: BTreeSet<String>,

    /// Loading events dropped by the window
    pub excluded_events: usize,
}

impl LoadingTubeAggregate {
    /// Collects the tube's events, bucket entries and controls for `batch`.
    /// Without a window every loading event of the given kinds counts.
    pub fn collect(
        vessel: &Vessel,
        batch: &Batch,
        kinds: &[LabEventType],
        window: Option<&EventWindow>,
    ) -> Self {
        let mut events: Vec<LabEvent> = Vec::new();
        let mut excluded_events = 0;
        for event in vessel.events.iter().filter(|e| kinds.contains(&e.event_type)) {
            if window.map_or(true, |w| w.contains(event.event_date)) {
                events.push(event.clone());
            } else {
                excluded_events += 1;
            }
        }
        events.sort_by_key(|e| (e.event_date, e.id));

        let mut bucket_entries: Vec<BucketEntry> = Vec::new();
        let mut starting_vessels: BTreeSet<VesselRef> = BTreeSet::new();
        let mut mentioned: BTreeSet<String> = BTreeSet::new();

        for instance in &vessel.sample_instances {
            mentioned.extend(instance.all_batches().into_iter().map(str::to_string));
            if !instance.belongs_to(&batch.name) {
                continue;
            }
            starting_vessels.extend(
                instance
                    .batch_starting_vessels
                    .iter()
                    .filter(|sv| sv.batch == batch.name)
                    .map(|sv| sv.vessel.clone()),
            );
            for entry in instance.bucket_entries.iter().filter(|e| e.batch == batch.name) {
                if !bucket_entries.contains(entry) {
                    bucket_entries.push(entry.clone());
                }
            }
        }

        let bucketed: BTreeSet<&str> = bucket_entries
            .iter()
            .map(|e| e.vessel.barcode.as_str())
            .collect();
        let controls = starting_vessels
            .into_iter()
            .filter(|sv| !bucketed.contains(sv.barcode.as_str()))
            .collect();

        mentioned.remove(&batch.name);

        Self {
            vessel: vessel.clone(),
            batch: batch.clone(),
            events,
            bucket_entries,
            controls,
            additional_batches: mentioned,
            excluded_events,
        }
    }

    /// Event with the highest id; its kind names the tube type.
    pub fn latest_event(&self) -> Option<&LabEvent> {
        self.events.iter().max_by_key(|e| e.id)
    }
}
