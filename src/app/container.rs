use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::adapters::{
    ConsoleNotifier, FFmpegEngineAdapter, FixedDirectoryPicker, PromptDirectoryPicker,
    SplitterConfig,
};
use crate::app::{engine_lifecycle::EngineLifecycle, split_interactor::SplitInteractor};
use crate::domain::errors::DomainError;
use crate::ports::{DestinationPickerPort, EnginePort, NotifyPort};

pub trait AppContainer: Send + Sync {
    fn split_interactor(&self) -> Arc<SplitInteractor>;
    fn engine(&self) -> Arc<EngineLifecycle>;
}

pub struct DefaultAppContainer {
    engine: Arc<EngineLifecycle>,
    split_interactor: Arc<SplitInteractor>,
}

impl DefaultAppContainer {
    /// Wire the production adapters described by `config`; `cancel` also ends the folder prompt
    pub fn new(
        config: &SplitterConfig,
        quiet: bool,
        cancel: &CancellationToken,
    ) -> Result<Self, DomainError> {
        let engine_port = Arc::new(FFmpegEngineAdapter::new());
        let picker: Arc<dyn DestinationPickerPort> = match &config.output_dir {
            Some(dir) => Arc::new(FixedDirectoryPicker::new(dir)),
            None => Arc::new(PromptDirectoryPicker::stdin().with_cancel(cancel.clone())),
        };
        let notifier = if quiet {
            Arc::new(ConsoleNotifier::quiet())
        } else {
            Arc::new(ConsoleNotifier::new())
        };

        Self::with_ports(
            config,
            engine_port as Arc<dyn EnginePort>,
            picker,
            notifier as Arc<dyn NotifyPort>,
        )
    }

    /// Wire the interactor around caller-supplied ports
    pub fn with_ports(
        config: &SplitterConfig,
        engine_port: Arc<dyn EnginePort>,
        picker: Arc<dyn DestinationPickerPort>,
        notifier: Arc<dyn NotifyPort>,
    ) -> Result<Self, DomainError> {
        config.validate()?;

        let engine = Arc::new(
            EngineLifecycle::new(engine_port, config.engine_resources())
                .with_timeout(config.engine_timeout()),
        );

        let split_interactor = Arc::new(
            SplitInteractor::new(
                Arc::clone(&engine),
                picker,
                notifier,
                config.encode_settings(),
            )
            .with_diagnostic_lines(config.diagnostic_lines),
        );

        Ok(Self {
            engine,
            split_interactor,
        })
    }
}

impl AppContainer for DefaultAppContainer {
    fn split_interactor(&self) -> Arc<SplitInteractor> {
        Arc::clone(&self.split_interactor)
    }

    fn engine(&self) -> Arc<EngineLifecycle> {
        Arc::clone(&self.engine)
    }
}
