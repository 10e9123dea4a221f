use std::fmt;

use crate::sink::SinkStats;

/// Statistics of a generation run.
///
/// Returned on success and, inside a failure, up to the point of the error.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunStats {
    /// Discovered tangible states.
    pub tangible_states: usize,
    /// Vanishing states kept in the vanishing partition (0 after transitive elimination).
    pub vanishing_states: usize,
    /// Number of vanishing state explorations.
    pub vanishing_explored: usize,
    /// Number of state explorations, tangible and vanishing.
    pub explored: usize,
    /// Edges forwarded to the sink, including those produced by elimination.
    ///
    /// The sink may still drop some of them (weighted self-loops, zero weights); those
    /// are counted in `sink.dropped`, and `sink.edges` counts what was kept.
    pub edges: usize,
    /// Tangible edges produced by vanishing elimination, one per entry into the
    /// vanishing partition and tangible state it reaches.
    pub eliminated_paths: usize,
    pub pool_peak: usize,
    pub sink: SinkStats,
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "tangible states:    {}", self.tangible_states)?;
        writeln!(f, "vanishing states:   {}", self.vanishing_states)?;
        writeln!(f, "vanishing explored: {}", self.vanishing_explored)?;
        writeln!(f, "explored:           {}", self.explored)?;
        writeln!(f, "edges forwarded:    {}", self.edges)?;
        writeln!(f, "edges dropped:      {}", self.sink.dropped)?;
        writeln!(f, "eliminated paths:   {}", self.eliminated_paths)?;
        writeln!(f, "minterm pool peak:  {}", self.pool_peak)?;
        writeln!(f, "batches:            {}", self.sink.batches)?;
        writeln!(f, "relation nodes:     {}", self.sink.nodes)?;
        writeln!(f, "peak nodes:         {}", self.sink.peak_nodes)?;
        write!(f, "peak memory:        {} bytes", self.sink.peak_memory)
    }
}
