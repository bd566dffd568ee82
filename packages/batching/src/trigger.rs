//! Periodic trigger that drives batch cuts.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use ractor::rpc::CallResult;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Callback run on every tick.
pub type TickFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Future type returned by trigger providers.
pub type TriggerFuture<T> = Pin<Box<dyn Future<Output = Result<T, TriggerError>> + Send>>;

/// Trigger errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TriggerError {
    #[error("Failed to create trigger: {0}")]
    Create(String),

    #[error("Failed to stop trigger: {0}")]
    Stop(String),
}

/// Source of periodic ticks.
pub trait TriggerProvider: Send + Sync + 'static {
    /// Start calling `on_tick` every `period`, first after one full period.
    fn schedule(&self, period: Duration, on_tick: TickFn) -> TriggerFuture<Box<dyn ScheduledTrigger>>;
}

/// Handle to a running trigger.
pub trait ScheduledTrigger: Send + Sync {
    /// Stop ticking. A tick already in progress runs to completion first.
    fn stop(self: Box<Self>) -> TriggerFuture<()>;
}

/// Messages for the TickerActor.
pub enum TickerMessage {
    /// Run the tick callback once, replying when it has finished.
    Tick { reply: RpcReplyPort<()> },
}

/// Ticker actor arguments.
pub struct TickerArgs {
    pub period: Duration,
    pub on_tick: TickFn,
}

/// State for the ticker actor.
pub struct TickerState {
    on_tick: TickFn,
    /// Interval loop feeding ticks into the mailbox, one in flight at a time.
    pump: JoinHandle<()>,
}

/// Actor that runs the tick callback, one tick at a time.
pub struct TickerActor;

impl Actor for TickerActor {
    type Msg = TickerMessage;
    type State = TickerState;
    type Arguments = TickerArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::debug!("Starting ticker every {:?}", args.period);

        let period = args.period;
        let pump = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let started = Instant::now();
                let finished = myself
                    .call(|reply| TickerMessage::Tick { reply }, None)
                    .await;
                if !matches!(finished, Ok(CallResult::Success(()))) {
                    break;
                }
                // A tick that overran its period pushes the next one a full
                // period out instead of firing straight away.
                if started.elapsed() >= period {
                    tracing::debug!("Tick overran its period, skipping missed ticks");
                    interval.reset();
                }
            }
        });

        Ok(TickerState {
            on_tick: args.on_tick,
            pump,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            TickerMessage::Tick { reply } => {
                (state.on_tick)().await;
                let _ = reply.send(());
            }
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.pump.abort();
        tracing::debug!("Ticker stopped");
        Ok(())
    }
}

/// Trigger provider backed by a [`TickerActor`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ActorTrigger;

impl TriggerProvider for ActorTrigger {
    fn schedule(&self, period: Duration, on_tick: TickFn) -> TriggerFuture<Box<dyn ScheduledTrigger>> {
        Box::pin(async move {
            if period.is_zero() {
                return Err(TriggerError::Create("period must be non-zero".into()));
            }

            let (actor, handle) = Actor::spawn(None, TickerActor, TickerArgs { period, on_tick })
                .await
                .map_err(|e| TriggerError::Create(e.to_string()))?;

            Ok(Box::new(ActorTriggerHandle { actor, handle }) as Box<dyn ScheduledTrigger>)
        })
    }
}

/// Running [`TickerActor`] and its join handle.
pub struct ActorTriggerHandle {
    actor: ActorRef<TickerMessage>,
    handle: JoinHandle<()>,
}

impl ScheduledTrigger for ActorTriggerHandle {
    fn stop(self: Box<Self>) -> TriggerFuture<()> {
        Box::pin(async move {
            self.actor.stop(None);
            self.handle
                .await
                .map_err(|e| TriggerError::Stop(e.to_string()))
        })
    }
}
