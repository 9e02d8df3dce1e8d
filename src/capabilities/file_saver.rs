//! Client-side download capability. Fire-and-forget: the shell saves the
//! data URI under the given filename and the core does not wait for an
//! outcome.

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSaverOperation {
    pub data_uri: String,
    pub filename: String,
}

impl Operation for FileSaverOperation {
    type Output = ();
}

#[derive(Clone)]
pub struct FileSaver<Ev> {
    context: CapabilityContext<FileSaverOperation, Ev>,
}

impl<Ev> Capability<Ev> for FileSaver<Ev> {
    type Operation = FileSaverOperation;
    type MappedSelf<MappedEv> = FileSaver<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static,
    {
        FileSaver::new(self.context.map_event(f))
    }
}

impl<Ev> FileSaver<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<FileSaverOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn save(&self, data_uri: String, filename: String) {
        let context = self.context.clone();
        self.context.spawn(async move {
            context
                .notify_shell(FileSaverOperation { data_uri, filename })
                .await;
        });
    }
}
