//! Event dispatch: acknowledge envelopes and act on LED commands.

use ledbot_net::Result;

use crate::envelope::{Acknowledgement, DISCONNECT, EVENTS_API, Envelope, HELLO};
use crate::led::{LedOutput, LedState};
use crate::logging::targets;

/// Sends acknowledgements back over the live connection.
#[allow(async_fn_in_trait)]
pub trait Acknowledge {
    async fn acknowledge(&mut self, ack: &Acknowledgement) -> Result<()>;
}

/// Posts a reply message to a channel.
#[allow(async_fn_in_trait)]
pub trait MessagePoster {
    async fn post_message(&self, channel: &str, text: &str) -> Result<()>;
}

/// A command recognized in mention text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedCommand {
    On,
    Off,
}

impl LedCommand {
    /// Scan `text` case-insensitively for "led on", then "led off".
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.to_lowercase();
        if text.contains("led on") {
            Some(Self::On)
        } else if text.contains("led off") {
            Some(Self::Off)
        } else {
            None
        }
    }

    pub fn state(self) -> LedState {
        match self {
            Self::On => LedState::On,
            Self::Off => LedState::Off,
        }
    }

    /// Reply posted after the LED was switched.
    pub fn reply(self) -> &'static str {
        match self {
            Self::On => "The LED is now on :bulb:",
            Self::Off => "The LED is now off",
        }
    }
}

/// What [`EventDispatcher::dispatch`] did with an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Hello,
    Disconnect {
        reason: Option<String>,
    },
    /// An `events_api` envelope was acknowledged.
    Acknowledged {
        envelope_id: String,
        /// Command found in an `app_mention`, if any.
        command: Option<LedCommand>,
        /// Whether a reply message was posted.
        replied: bool,
    },
    /// An `events_api` envelope had no id to acknowledge with.
    MissingEnvelopeId,
    /// Any other envelope type.
    Ignored {
        kind: String,
    },
}

/// Routes decoded envelopes to the LED and the reply poster.
pub struct EventDispatcher<L, P> {
    led: L,
    poster: P,
}

impl<L, P> EventDispatcher<L, P>
where
    L: LedOutput,
    P: MessagePoster,
{
    pub fn new(led: L, poster: P) -> Self {
        Self { led, poster }
    }

    pub fn led(&self) -> &L {
        &self.led
    }

    pub fn poster(&self) -> &P {
        &self.poster
    }

    /// Handle one envelope.
    ///
    /// Every `events_api` envelope carrying an id is acknowledged exactly
    /// once, after the LED was switched and before any reply is posted.
    /// Unknown envelope types are ignored. Errors come only from the
    /// acknowledgement or the reply post.
    pub async fn dispatch<A>(
        &mut self,
        envelope: &Envelope,
        acker: &mut A,
    ) -> Result<DispatchOutcome>
    where
        A: Acknowledge,
    {
        match envelope.kind.as_str() {
            HELLO => {
                tracing::info!(target: targets::DISPATCH, "connected to Socket Mode");
                Ok(DispatchOutcome::Hello)
            }
            DISCONNECT => {
                tracing::info!(
                    target: targets::DISPATCH,
                    reason = envelope.reason.as_deref().unwrap_or("unspecified"),
                    "server requested disconnect"
                );
                Ok(DispatchOutcome::Disconnect {
                    reason: envelope.reason.clone(),
                })
            }
            EVENTS_API => self.dispatch_event(envelope, acker).await,
            other => {
                tracing::debug!(target: targets::DISPATCH, kind = other, "ignoring envelope");
                Ok(DispatchOutcome::Ignored {
                    kind: other.to_string(),
                })
            }
        }
    }

    async fn dispatch_event<A>(
        &mut self,
        envelope: &Envelope,
        acker: &mut A,
    ) -> Result<DispatchOutcome>
    where
        A: Acknowledge,
    {
        let Some(envelope_id) = envelope.envelope_id.clone() else {
            tracing::warn!(target: targets::DISPATCH, "events_api envelope without envelope_id");
            return Ok(DispatchOutcome::MissingEnvelopeId);
        };

        let mention = envelope.app_mention();
        let command = mention.as_ref().and_then(|m| LedCommand::parse(&m.text));

        let mut reply = None;
        if let (Some(mention), Some(command)) = (&mention, command) {
            match self.led.set(command.state()) {
                Ok(()) => reply = Some((mention.channel.as_str(), command.reply())),
                Err(e) => tracing::error!(
                    target: targets::DISPATCH,
                    ?command,
                    "failed to switch LED: {}",
                    e
                ),
            }
        }

        acker.acknowledge(&Acknowledgement::new(envelope_id.as_str())).await?;
        tracing::debug!(target: targets::DISPATCH, %envelope_id, "acknowledged");

        let replied = match reply {
            Some((channel, text)) => {
                self.poster.post_message(channel, text).await?;
                true
            }
            None => false,
        };

        Ok(DispatchOutcome::Acknowledged {
            envelope_id,
            command,
            replied,
        })
    }
}
