// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use slotmap::new_key_type;

new_key_type! {
    /// Generational key into [`TextureResource`](crate::TextureResource).
    /// A handle whose texture was removed never resolves again.
    pub struct TextureHandle;
}
