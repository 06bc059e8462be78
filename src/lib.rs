pub mod core;
pub mod query;
pub mod source;
pub mod search;
pub mod storage;
pub mod service;

/*
┌────────────────────────────────────────────────────────────────────────────────────────────┐
│                              LOG INDEXER STRUCT ARCHITECTURE                                │
└────────────────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────────── SERVICE LAYER ───────────────────────────────────────┐
│                                                                                              │
│  ┌────────────────────────────────────────────────────────────────────────────────────┐    │
│  │                               struct LogIndexer                                     │    │
│  │ executor: SearchExecutor           // Pull/filter/collect over one source          │    │
│  │ sessions: Arc<SessionStore>        // Persisted grouped searches                   │    │
│  │ config: Config                     // Timeouts, retention, facet ceilings          │    │
│  │ reaper: Mutex<Option<Reaper>>      // Background expiry sweep                      │    │
│  └────────────────────────────────────────────────────────────────────────────────────┘    │
│                                                                                              │
│  stdio::serve ──reads──> RequestEnvelope ──dispatch──> health_check / search /              │
│                                                        search_and_group                     │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌─────────────────────────────────────── SEARCH LAYER ───────────────────────────────────────┐
│                                                                                              │
│  ┌──────────────────────────┐  ┌──────────────────────────┐  ┌──────────────────────────┐  │
│  │ struct SearchExecutor    │  │ struct FacetAggregator   │  │ enum ConditionNode       │  │
│  │ • source: Arc<dyn        │  │ • facets: BTreeMap<      │  │ • Predicate(Predicate)   │  │
│  │   LogSource>             │  │   String, Facet>         │  │ • Group(BoolGroup)       │  │
│  │ • default_timeout        │  │ • limits: FacetLimits    │  │                          │  │
│  │ • max_grouped_matches    │  │                          │  │ matcher::evaluate(node,  │  │
│  │ • facet_limits           │  │ enum FacetState          │  │   record) -> bool        │  │
│  └──────────────────────────┘  │ • Text / Numeric         │  └──────────────────────────┘  │
│                                │ • Frozen / Ranged        │                                 │
│                                └──────────────────────────┘                                 │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────────── STORAGE LAYER ───────────────────────────────────────┐
│                                                                                              │
│  ┌──────────────────────────┐  ┌──────────────────────────┐  ┌──────────────────────────┐  │
│  │ struct SessionStore      │  │ struct SessionLayout     │  │ struct Reaper            │  │
│  │ • sessions: RwLock<      │  │ • base_dir               │  │ • stop: Sender<()>       │  │
│  │   HashMap<SessionId,     │  │ • sessions_dir           │  │ • handle: JoinHandle     │  │
│  │   SessionEntry>>         │  │   <id>.rec  <id>.idx     │  │                          │  │
│  │ • entry.lock: Arc<       │  └──────────────────────────┘  └──────────────────────────┘  │
│  │   RwLock<()>>            │                                                               │
│  └──────────────────────────┘                                                               │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────────── RELATIONSHIPS ───────────────────────────────────────┐
│                                                                                              │
│  LogIndexer ──owns──> SearchExecutor ──opens──> LogIterator ──pulls──> Record               │
│     │                      │                                                                │
│     │                      ├──uses──> matcher::evaluate                                     │
│     │                      └──feeds──> FacetAggregator ──holds──> Facet                    │
│     │                                                                                       │
│     ├──owns──> SessionStore ──writes──> SessionWriter                                       │
│     │               └──reads──> SessionReader                                               │
│     │                                                                                       │
│     └──owns──> Reaper ──sweeps──> SessionStore                                              │
│                                                                                              │
│  SourceRegistry ──creates──> Arc<dyn LogSource> (MemorySource, JsonLinesSource)             │
│                                                                                              │
└──────────────────────────────────────────────────────────────────────────────────────────────┘
*/
