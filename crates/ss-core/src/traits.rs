use std::time::Duration;

use crate::frame::{AudioBlock, InputSource, SessionFormat};

/// Collaborateur hôte : fournit spectres, état micro et cadence de tick.
///
/// Implémenté par : l'hôte de scripts (`ScriptedHost` dans ss-app) et les
/// doublures de test. Toutes les méthodes sont synchrones et ne bloquent JAMAIS ;
/// le moteur les appelle au plus une fois par passe d'analyse.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use ss_core::frame::{AudioBlock, InputSource, SessionFormat};
/// use ss_core::traits::AudioHost;
///
/// struct SilentHost;
/// impl AudioHost for SilentHost {
///     fn session_format(&self) -> Option<SessionFormat> { SessionFormat::new(48_000, 2048).ok() }
///     fn fill_magnitudes(&mut self, _source: InputSource, out: &mut [f32]) -> bool {
///         out.fill(0.0);
///         true
///     }
///     fn microphone_active(&self) -> bool { false }
///     fn raw_audio_block(&self) -> Option<&AudioBlock> { None }
///     fn tick_interval(&self) -> Option<Duration> { Some(Duration::from_millis(33)) }
///     fn now(&self) -> Duration { Duration::ZERO }
/// }
/// ```
pub trait AudioHost {
    /// Format de l'analyseur (constant pour la session).
    ///
    /// `None` tant que le moteur audio de l'hôte n'existe pas : le moteur reste
    /// alors non démarré.
    fn session_format(&self) -> Option<SessionFormat>;

    /// Écrit le spectre courant de `source` dans `out` (longueur `bin_count`).
    ///
    /// Retourne `false` si la source ne peut rien fournir pour ce tick ; le
    /// contenu de `out` est alors ignoré.
    fn fill_magnitudes(&mut self, source: InputSource, out: &mut [f32]) -> bool;

    /// `true` si la session micro est ouverte et active.
    fn microphone_active(&self) -> bool;

    /// Demande l'ouverture du micro. Idempotent ; peut rester sans effet
    /// (permission refusée, pas de périphérique).
    fn connect_microphone(&mut self) {}

    /// Dernier bloc PCM brut, pour la capture de relecture uniquement.
    fn raw_audio_block(&self) -> Option<&AudioBlock>;

    /// Intervalle minimal entre deux passes d'analyse (durée d'un tick hôte).
    ///
    /// `None` si l'hôte ne connaît pas encore sa cadence : les accesseurs
    /// répondent alors « indisponible ».
    fn tick_interval(&self) -> Option<Duration>;

    /// Temps monotone écoulé depuis le démarrage de l'hôte.
    fn now(&self) -> Duration;
}
